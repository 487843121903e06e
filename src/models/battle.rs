use chrono::Local;
use serde::Serialize;

// One battle row. The phase is never stored, it derives from the two
// nullable fields: no winner and no move holder means the players are still
// placing ships, a move holder means the game runs, a winner means it ended.
#[derive(Clone, Debug)]
pub struct Battle {
    pub address: String,
    pub first_player: Option<u64>,
    pub second_player: Option<u64>,
    pub whose_move: Option<PlayerSlot>,
    pub who_win: Option<PlayerSlot>,
    pub created: chrono::DateTime<Local>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BattlePhase {
    Preparation,
    Progress,
    Over,
}

// The two participant positions of a battle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerSlot {
    First,
    Second,
}

impl PlayerSlot {
    pub fn other(self) -> PlayerSlot {
        match self {
            Self::First => Self::Second,
            Self::Second => Self::First,
        }
    }
}

impl Battle {
    pub fn new(address: String) -> Self {
        Battle {
            address,
            first_player: None,
            second_player: None,
            whose_move: None,
            who_win: None,
            created: Local::now(),
        }
    }

    pub fn phase(&self) -> BattlePhase {
        if self.who_win.is_some() {
            return BattlePhase::Over;
        }
        if self.whose_move.is_some() {
            return BattlePhase::Progress;
        }
        BattlePhase::Preparation
    }

    pub fn player(&self, slot: PlayerSlot) -> Option<u64> {
        match slot {
            PlayerSlot::First => self.first_player,
            PlayerSlot::Second => self.second_player,
        }
    }

    pub fn set_player(&mut self, slot: PlayerSlot, player: Option<u64>) {
        match slot {
            PlayerSlot::First => self.first_player = player,
            PlayerSlot::Second => self.second_player = player,
        }
    }

    // First slot wins when both are free
    pub fn free_slot(&self) -> Option<PlayerSlot> {
        if self.first_player.is_none() {
            return Some(PlayerSlot::First);
        }
        if self.second_player.is_none() {
            return Some(PlayerSlot::Second);
        }
        None
    }

    pub fn is_full(&self) -> bool {
        self.first_player.is_some() && self.second_player.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.first_player.is_none() && self.second_player.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_derives_from_nullable_fields() {
        let mut battle = Battle::new("abc".to_string());
        assert_eq!(battle.phase(), BattlePhase::Preparation);

        battle.whose_move = Some(PlayerSlot::First);
        assert_eq!(battle.phase(), BattlePhase::Progress);

        battle.whose_move = None;
        battle.who_win = Some(PlayerSlot::Second);
        assert_eq!(battle.phase(), BattlePhase::Over);

        // a winner wins the derivation even if a move holder lingers
        battle.whose_move = Some(PlayerSlot::First);
        assert_eq!(battle.phase(), BattlePhase::Over);
    }

    #[test]
    fn free_slot_prefers_first() {
        let mut battle = Battle::new("abc".to_string());
        assert_eq!(battle.free_slot(), Some(PlayerSlot::First));

        battle.first_player = Some(1);
        assert_eq!(battle.free_slot(), Some(PlayerSlot::Second));

        battle.second_player = Some(2);
        assert_eq!(battle.free_slot(), None);
        assert!(battle.is_full());

        battle.first_player = None;
        assert_eq!(battle.free_slot(), Some(PlayerSlot::First));
        assert!(!battle.is_empty());
    }

    #[test]
    fn slots_flip() {
        assert_eq!(PlayerSlot::First.other(), PlayerSlot::Second);
        assert_eq!(PlayerSlot::Second.other(), PlayerSlot::First);
    }
}
