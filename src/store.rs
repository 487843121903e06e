use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use log::{debug, info};
use rand::Rng;

use crate::errors::JoinError;
use crate::models::battle::{Battle, BattlePhase, PlayerSlot};
use crate::models::player::Player;

const ADDRESS_LEN: usize = 15;
const ADDRESS_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

// All battles and connected players, behind one lock. Every public method
// takes the lock, verifies the current state and writes in the same critical
// section, so two sockets can never both claim the same slot or the same move.
pub struct BattleStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    battles: HashMap<String, Battle>,
    players: HashMap<u64, Player>,
    next_player_id: u64,
}

// What a successful join hands back to the socket task
pub struct Joined {
    pub battle: Battle,
    pub slot: PlayerSlot,
    pub player_id: u64,
    pub peer_channel: Option<u64>,
}

pub enum LeaveOutcome {
    BattleRemoved,
    OpponentRemains { channel: Option<u64> },
}

impl BattleStore {
    pub fn new() -> BattleStore {
        BattleStore {
            inner: Mutex::new(Inner {
                next_player_id: 1,
                ..Inner::default()
            }),
        }
    }

    fn locked(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|err| err.into_inner())
    }

    pub fn create_battle(&self) -> Battle {
        let mut inner = self.locked();
        let address = loop {
            let candidate = random_address();
            if !inner.battles.contains_key(&candidate) {
                break candidate;
            }
        };
        let battle = Battle::new(address.clone());
        info!("battle {} created at {}", battle.address, battle.created);
        inner.battles.insert(address, battle.clone());
        battle
    }

    pub fn battle(&self, address: &str) -> Option<Battle> {
        self.locked().battles.get(address).cloned()
    }

    pub fn join(&self, address: &str, channel: u64) -> Result<Joined, JoinError> {
        let mut inner = self.locked();
        let player_id = inner.next_player_id;

        let battle = inner
            .battles
            .get_mut(address)
            .ok_or(JoinError::UnknownBattle)?;
        let slot = battle.free_slot().ok_or(JoinError::BattleFull)?;
        battle.set_player(slot, Some(player_id));
        let snapshot = battle.clone();

        inner.next_player_id += 1;
        let player = Player {
            id: player_id,
            channel,
        };
        debug!(
            "player {} took slot {:?} in battle {}",
            player.id, slot, address
        );
        inner.players.insert(player.id, player);

        let peer_channel = snapshot
            .player(slot.other())
            .and_then(|id| inner.players.get(&id))
            .map(|peer| peer.channel);

        Ok(Joined {
            battle: snapshot,
            slot,
            player_id,
            peer_channel,
        })
    }

    // Clears the slot held by player_id. The battle disappears once both
    // slots are empty; otherwise the caller learns where to reach the peer.
    pub fn leave(&self, address: &str, slot: PlayerSlot, player_id: u64) -> Option<LeaveOutcome> {
        let mut inner = self.locked();
        inner.players.remove(&player_id);

        let battle = inner.battles.get_mut(address)?;
        if battle.player(slot) != Some(player_id) {
            return None;
        }
        battle.set_player(slot, None);
        let empty = battle.is_empty();
        let peer_id = battle.player(slot.other());

        if empty {
            inner.battles.remove(address);
            info!("battle {} removed", address);
            return Some(LeaveOutcome::BattleRemoved);
        }
        let channel = peer_id
            .and_then(|id| inner.players.get(&id))
            .map(|peer| peer.channel);
        Some(LeaveOutcome::OpponentRemains { channel })
    }

    // Looks the opponent's mailbox up fresh, so a peer that reconnected
    // since the last call is reached on its current channel
    pub fn peer_channel(&self, address: &str, slot: PlayerSlot) -> Option<u64> {
        let inner = self.locked();
        let battle = inner.battles.get(address)?;
        battle
            .player(slot.other())
            .and_then(|id| inner.players.get(&id))
            .map(|peer| peer.channel)
    }

    // Moves a battle out of preparation; the first player opens. Returns
    // false when somebody else already did, so only one caller announces it.
    pub fn begin(&self, address: &str) -> bool {
        let mut inner = self.locked();
        match inner.battles.get_mut(address) {
            Some(battle) if battle.phase() == BattlePhase::Preparation => {
                battle.whose_move = Some(PlayerSlot::First);
                info!("battle {} started", address);
                true
            }
            _ => false,
        }
    }

    pub fn pass_move(&self, address: &str, from: PlayerSlot) -> bool {
        let mut inner = self.locked();
        match inner.battles.get_mut(address) {
            Some(battle)
                if battle.phase() == BattlePhase::Progress && battle.whose_move == Some(from) =>
            {
                battle.whose_move = Some(from.other());
                true
            }
            _ => false,
        }
    }

    // True while the battle runs and the slot still owns the move
    pub fn holds_move(&self, address: &str, slot: PlayerSlot) -> bool {
        match self.locked().battles.get(address) {
            Some(battle) => {
                battle.phase() == BattlePhase::Progress && battle.whose_move == Some(slot)
            }
            None => false,
        }
    }

    pub fn finish(&self, address: &str, winner: PlayerSlot) -> bool {
        let mut inner = self.locked();
        match inner.battles.get_mut(address) {
            Some(battle) if battle.phase() == BattlePhase::Progress => {
                battle.who_win = Some(winner);
                battle.whose_move = None;
                info!("battle {} is over, {:?} won", address, winner);
                true
            }
            _ => false,
        }
    }
}

fn random_address() -> String {
    let mut rng = rand::thread_rng();
    (0..ADDRESS_LEN)
        .map(|_| ADDRESS_ALPHABET[rng.gen_range(0..ADDRESS_ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addresses_are_short_lowercase_tokens() {
        let store = BattleStore::new();
        let battle = store.create_battle();
        assert_eq!(battle.address.len(), 15);
        assert!(battle
            .address
            .bytes()
            .all(|b| ADDRESS_ALPHABET.contains(&b)));
        assert_eq!(battle.phase(), BattlePhase::Preparation);
    }

    #[test]
    fn join_fills_first_then_second_then_rejects() {
        let store = BattleStore::new();
        let battle = store.create_battle();

        let a = store.join(&battle.address, 11).expect("first join");
        assert_eq!(a.slot, PlayerSlot::First);
        assert_eq!(a.peer_channel, None);

        let b = store.join(&battle.address, 22).expect("second join");
        assert_eq!(b.slot, PlayerSlot::Second);
        assert_eq!(b.peer_channel, Some(11));
        assert_ne!(a.player_id, b.player_id);

        assert!(matches!(
            store.join(&battle.address, 33),
            Err(JoinError::BattleFull)
        ));
    }

    #[test]
    fn join_rejects_unknown_addresses() {
        let store = BattleStore::new();
        assert!(matches!(
            store.join("nosuchbattle", 1),
            Err(JoinError::UnknownBattle)
        ));
    }

    #[test]
    fn peer_channel_follows_reconnects() {
        let store = BattleStore::new();
        let battle = store.create_battle();
        let a = store.join(&battle.address, 11).expect("first join");
        let b = store.join(&battle.address, 22).expect("second join");

        assert_eq!(store.peer_channel(&battle.address, a.slot), Some(22));
        assert_eq!(store.peer_channel(&battle.address, b.slot), Some(11));

        // the first player drops and comes back on a new channel
        store.leave(&battle.address, a.slot, a.player_id);
        assert_eq!(store.peer_channel(&battle.address, b.slot), None);
        store.join(&battle.address, 99).expect("rejoin");
        assert_eq!(store.peer_channel(&battle.address, b.slot), Some(99));
    }

    #[test]
    fn battle_vanishes_when_the_last_player_leaves() {
        let store = BattleStore::new();
        let battle = store.create_battle();
        let a = store.join(&battle.address, 11).expect("first join");
        let b = store.join(&battle.address, 22).expect("second join");

        match store.leave(&battle.address, a.slot, a.player_id) {
            Some(LeaveOutcome::OpponentRemains { channel }) => assert_eq!(channel, Some(22)),
            _ => panic!("the second player is still there"),
        }
        assert!(store.battle(&battle.address).is_some());

        assert!(matches!(
            store.leave(&battle.address, b.slot, b.player_id),
            Some(LeaveOutcome::BattleRemoved)
        ));
        assert!(store.battle(&battle.address).is_none());
    }

    #[test]
    fn leave_ignores_a_stale_player_id() {
        let store = BattleStore::new();
        let battle = store.create_battle();
        let a = store.join(&battle.address, 11).expect("first join");
        let _b = store.join(&battle.address, 22).expect("second join");

        // the seat is given up and taken over in between
        store.leave(&battle.address, a.slot, a.player_id);
        let again = store.join(&battle.address, 33).expect("rejoin");
        assert_eq!(again.slot, a.slot);

        // the stale leave must not evict the new occupant
        assert!(store.leave(&battle.address, a.slot, a.player_id).is_none());
        assert_eq!(
            store
                .battle(&battle.address)
                .expect("still there")
                .player(again.slot),
            Some(again.player_id)
        );
    }

    #[test]
    fn begin_runs_once_and_gives_first_the_move() {
        let store = BattleStore::new();
        let battle = store.create_battle();

        assert!(store.begin(&battle.address));
        let started = store.battle(&battle.address).expect("battle exists");
        assert_eq!(started.phase(), BattlePhase::Progress);
        assert_eq!(started.whose_move, Some(PlayerSlot::First));

        // a second caller lost the race
        assert!(!store.begin(&battle.address));
        assert!(!store.begin("nosuchbattle"));
    }

    #[test]
    fn pass_move_only_flips_for_the_holder() {
        let store = BattleStore::new();
        let battle = store.create_battle();
        assert!(!store.pass_move(&battle.address, PlayerSlot::First));

        store.begin(&battle.address);
        assert!(!store.pass_move(&battle.address, PlayerSlot::Second));
        assert!(store.pass_move(&battle.address, PlayerSlot::First));
        assert_eq!(
            store.battle(&battle.address).expect("battle exists").whose_move,
            Some(PlayerSlot::Second)
        );
    }

    #[test]
    fn holds_move_follows_the_turn() {
        let store = BattleStore::new();
        let battle = store.create_battle();
        assert!(!store.holds_move(&battle.address, PlayerSlot::First));

        store.begin(&battle.address);
        assert!(store.holds_move(&battle.address, PlayerSlot::First));
        assert!(!store.holds_move(&battle.address, PlayerSlot::Second));

        store.pass_move(&battle.address, PlayerSlot::First);
        assert!(store.holds_move(&battle.address, PlayerSlot::Second));

        // a settled battle holds no move for either side
        store.finish(&battle.address, PlayerSlot::Second);
        assert!(!store.holds_move(&battle.address, PlayerSlot::First));
        assert!(!store.holds_move(&battle.address, PlayerSlot::Second));
        assert!(!store.holds_move("nosuchbattle", PlayerSlot::First));
    }

    #[test]
    fn finish_settles_the_battle_exactly_once() {
        let store = BattleStore::new();
        let battle = store.create_battle();
        assert!(!store.finish(&battle.address, PlayerSlot::First));

        store.begin(&battle.address);
        assert!(store.finish(&battle.address, PlayerSlot::Second));

        let over = store.battle(&battle.address).expect("battle exists");
        assert_eq!(over.phase(), BattlePhase::Over);
        assert_eq!(over.who_win, Some(PlayerSlot::Second));
        assert_eq!(over.whose_move, None);

        assert!(!store.finish(&battle.address, PlayerSlot::First));
        assert!(!store.pass_move(&battle.address, PlayerSlot::Second));
    }
}
