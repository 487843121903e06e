use crate::models::battle::PlayerSlot;

// Cells of a ship, as (x, y) grid coordinates
pub type ShipCells = Vec<(u8, u8)>;

// A cell changes away from Empty exactly once and never back
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellState {
    Hit,
    Miss,
    Empty,
}

impl CellState {
    // The wire encoding: hit 1, miss 2, untouched 3
    pub fn as_int(self) -> u8 {
        match self {
            Self::Hit => 1,
            Self::Miss => 2,
            Self::Empty => 3,
        }
    }
}

// One player's half of a battle: the 10x10 grid plus the ship layout once a
// fleet has been accepted.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerBoard {
    pub field: [[CellState; 10]; 10],
    pub ships: Option<Vec<ShipCells>>,
}

impl PlayerBoard {
    pub fn new() -> Self {
        PlayerBoard {
            field: [[CellState::Empty; 10]; 10],
            ships: None,
        }
    }

    pub fn install_fleet(&mut self, ships: Vec<ShipCells>) {
        self.field = [[CellState::Empty; 10]; 10];
        self.ships = Some(ships);
    }

    pub fn clear_fleet(&mut self) {
        self.field = [[CellState::Empty; 10]; 10];
        self.ships = None;
    }

    pub fn has_fleet(&self) -> bool {
        self.ships.is_some()
    }

    pub fn cell(&self, x: u8, y: u8) -> CellState {
        self.field[x as usize][y as usize]
    }

    pub fn set_cell(&mut self, x: u8, y: u8, state: CellState) {
        self.field[x as usize][y as usize] = state;
    }

    // The ship occupying (x, y), as its index and cells
    pub fn ship_at(&self, x: u8, y: u8) -> Option<(usize, ShipCells)> {
        let ships = self.ships.as_ref()?;
        ships
            .iter()
            .enumerate()
            .find(|(_, ship)| ship.contains(&(x, y)))
            .map(|(index, ship)| (index, ship.clone()))
    }

    pub fn ship_sunk(&self, ship: &[(u8, u8)]) -> bool {
        ship.iter().all(|&(x, y)| self.cell(x, y) == CellState::Hit)
    }

    // Ships still afloat counted by size, index 0 holding the 1-cell ships
    pub fn live_ship_counts(&self) -> [u8; 4] {
        let mut counts = [0u8; 4];
        if let Some(ships) = &self.ships {
            for ship in ships {
                if !self.ship_sunk(ship) {
                    counts[ship.len() - 1] += 1;
                }
            }
        }
        counts
    }

    // True once every cell of every ship is hit. A board without a fleet
    // cannot be defeated.
    pub fn defeated(&self) -> bool {
        match &self.ships {
            Some(ships) => ships.iter().all(|ship| self.ship_sunk(ship)),
            None => false,
        }
    }

    pub fn field_ints(&self) -> Vec<Vec<u8>> {
        self.field
            .iter()
            .map(|row| row.iter().map(|cell| cell.as_int()).collect())
            .collect()
    }
}

// Both boards of one battle as held by a connection actor. A best-effort
// replica: the durable truth is the battle row, not this.
#[derive(Clone, Debug, PartialEq)]
pub struct Mirror {
    pub first: PlayerBoard,
    pub second: PlayerBoard,
}

impl Mirror {
    pub fn new() -> Self {
        Mirror {
            first: PlayerBoard::new(),
            second: PlayerBoard::new(),
        }
    }

    pub fn board(&self, slot: PlayerSlot) -> &PlayerBoard {
        match slot {
            PlayerSlot::First => &self.first,
            PlayerSlot::Second => &self.second,
        }
    }

    pub fn board_mut(&mut self, slot: PlayerSlot) -> &mut PlayerBoard {
        match slot {
            PlayerSlot::First => &mut self.first,
            PlayerSlot::Second => &mut self.second,
        }
    }

    pub fn both_ready(&self) -> bool {
        self.first.has_fleet() && self.second.has_fleet()
    }
}
