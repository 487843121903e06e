use std::collections::HashSet;

use serde_json::Value;

use crate::errors::FleetError;
use crate::models::board::{CellState, PlayerBoard, ShipCells};

// Outcome of one resolved shot. Invalid covers everything that must leave
// the board untouched: coordinates off the grid and cells already shot at.
#[derive(Debug, PartialEq, Eq)]
pub enum ShotOutcome {
    Invalid,
    Miss,
    Hit,
    Sunk(usize),
}

// Checks a submitted fleet layout and returns the parsed ships on success.
// First failure wins; the checks run in the order the client is told about
// them: shape, count, overlap, per-ship geometry, spacing, size ratio.
pub fn validate_fleet(ships: &Value) -> Result<Vec<ShipCells>, FleetError> {
    let parsed: Vec<Vec<(i64, i64)>> =
        serde_json::from_value(ships.clone()).map_err(|_| FleetError::InvalidInput)?;

    if parsed.len() != 10 {
        return Err(FleetError::WrongShipCount);
    }

    let distinct: HashSet<(i64, i64)> = parsed.iter().flatten().copied().collect();
    if distinct.len() < 20 {
        return Err(FleetError::OverlappingShips);
    }

    let mut counts_by_size = [0usize; 4];
    for ship in &parsed {
        validate_ship(ship, &mut counts_by_size)?;
    }

    let mut forbidden: HashSet<(i64, i64)> = HashSet::new();
    for ship in &parsed {
        if ship.iter().any(|cell| forbidden.contains(cell)) {
            return Err(FleetError::ShipsTooClose);
        }
        for &(x, y) in ship {
            for dx in -1..=1 {
                for dy in -1..=1 {
                    let neighbour = (x + dx, y + dy);
                    if !on_grid(neighbour.0, neighbour.1) {
                        continue;
                    }
                    if !ship.contains(&neighbour) {
                        forbidden.insert(neighbour);
                    }
                }
            }
        }
    }

    if counts_by_size != [4, 3, 2, 1] {
        return Err(FleetError::WrongRatio);
    }

    Ok(parsed
        .into_iter()
        .map(|ship| ship.into_iter().map(|(x, y)| (x as u8, y as u8)).collect())
        .collect())
}

// One ship must sit on the grid in a straight contiguous line of 1 to 4 cells
fn validate_ship(ship: &[(i64, i64)], counts_by_size: &mut [usize; 4]) -> Result<(), FleetError> {
    if ship.is_empty() || ship.len() > 4 {
        return Err(FleetError::WrongShipSize);
    }
    counts_by_size[ship.len() - 1] += 1;

    for &(x, y) in ship {
        if !on_grid(x, y) {
            return Err(FleetError::BadShipCoordinates);
        }
    }

    let same_x = ship.iter().all(|&(x, _)| x == ship[0].0);
    let same_y = ship.iter().all(|&(_, y)| y == ship[0].1);
    let line: Vec<i64> = if same_x {
        ship.iter().map(|&(_, y)| y).collect()
    } else if same_y {
        ship.iter().map(|&(x, _)| x).collect()
    } else {
        return Err(FleetError::BadShipCoordinates);
    };

    let mut min = line[0];
    let mut max = line[0];
    for &value in &line {
        min = min.min(value);
        max = max.max(value);
    }
    if max - min != line.len() as i64 - 1 {
        return Err(FleetError::BadShipCoordinates);
    }

    Ok(())
}

fn on_grid(x: i64, y: i64) -> bool {
    (0..=9).contains(&x) && (0..=9).contains(&y)
}

// Applies one shot to the target board. All checks run before any mutation,
// so a rejected shot leaves the board exactly as it was.
pub fn resolve_shot(board: &mut PlayerBoard, x: i64, y: i64) -> ShotOutcome {
    if !on_grid(x, y) {
        return ShotOutcome::Invalid;
    }
    let (x, y) = (x as u8, y as u8);
    if board.cell(x, y) != CellState::Empty {
        return ShotOutcome::Invalid;
    }

    match board.ship_at(x, y) {
        Some((index, ship)) => {
            board.set_cell(x, y, CellState::Hit);
            if board.ship_sunk(&ship) {
                reveal_halo(board, &ship);
                ShotOutcome::Sunk(index)
            } else {
                ShotOutcome::Hit
            }
        }
        None => {
            board.set_cell(x, y, CellState::Miss);
            ShotOutcome::Miss
        }
    }
}

// Marks the water around a sunk ship: every still-empty neighbour becomes a
// miss, which saves the opponent from probing cells that cannot hold a ship.
fn reveal_halo(board: &mut PlayerBoard, ship: &[(u8, u8)]) {
    for &(x, y) in ship {
        for dx in -1i64..=1 {
            for dy in -1i64..=1 {
                let (nx, ny) = (x as i64 + dx, y as i64 + dy);
                if !on_grid(nx, ny) {
                    continue;
                }
                let (nx, ny) = (nx as u8, ny as u8);
                if !ship.contains(&(nx, ny)) && board.cell(nx, ny) == CellState::Empty {
                    board.set_cell(nx, ny, CellState::Miss);
                }
            }
        }
    }
}
