use std::sync::Arc;

use log::{debug, error, info};
use serde_json::Value;

use crate::errors::{CommandError, JoinError};
use crate::logic::{resolve_shot, validate_fleet, ShotOutcome};
use crate::models::battle::{Battle, BattlePhase, PlayerSlot};
use crate::models::board::Mirror;
use crate::protocol::{parse_command, ClientCommand, ClientMessage, GameResult, PlayerView};
use crate::relay::{PeerEvent, Relay};
use crate::store::{BattleStore, LeaveOutcome};

// One actor per live connection. It owns a local mirror of both boards and
// never talks to the other actor directly: the peer is reached by looking its
// channel up in the store at send time, so a reconnected peer is still found.
// The socket task feeds client frames and relay events into the actor one at
// a time, which keeps every handler free of interleaving.
pub struct BattleActor {
    address: String,
    slot: PlayerSlot,
    player_id: u64,
    mirror: Mirror,
    awaiting_state: bool,
    store: Arc<BattleStore>,
    relay: Relay,
}

impl BattleActor {
    pub fn join(
        store: Arc<BattleStore>,
        relay: Relay,
        address: &str,
        channel: u64,
    ) -> Result<(BattleActor, Vec<ClientMessage>), JoinError> {
        let joined = store.join(address, channel)?;
        info!(
            "player {} connected to battle {} as {:?}",
            joined.player_id, address, joined.slot
        );

        let mut actor = BattleActor {
            address: address.to_string(),
            slot: joined.slot,
            player_id: joined.player_id,
            mirror: Mirror::new(),
            awaiting_state: false,
            store,
            relay,
        };

        let replies = vec![ClientMessage::State {
            phase: joined.battle.phase(),
        }];
        if let Some(peer) = joined.peer_channel {
            // pull the mirror from the peer instead of trusting anything
            // pushed before this join was visible to it
            actor.awaiting_state = true;
            actor.relay.send(peer, PeerEvent::StateRequest);
            actor.relay.send(peer, PeerEvent::Joined);
        }
        Ok((actor, replies))
    }

    pub fn handle_frame(&mut self, text: &str) -> Vec<ClientMessage> {
        debug!("player {} sent {}", self.player_id, text);
        match self.dispatch(text) {
            Ok(replies) => replies,
            Err(err) => {
                info!("player {} command rejected: {}", self.player_id, err);
                vec![ClientMessage::error(err)]
            }
        }
    }

    fn dispatch(&mut self, text: &str) -> Result<Vec<ClientMessage>, CommandError> {
        let command = parse_command(text)?;
        // the mirror stays blank until the peer answers the state request;
        // a command acting on it now would replicate the blanks over the
        // real boards on the next sync
        if self.awaiting_state {
            return Err(CommandError::WrongPhase);
        }
        match command {
            ClientCommand::LoadFleet { ships } => self.load_fleet(&ships),
            ClientCommand::TakeShot { x, y } => self.take_shot(&x, &y),
            ClientCommand::Surrender => self.surrender(),
        }
    }

    pub fn handle_peer(&mut self, event: PeerEvent) -> Vec<ClientMessage> {
        match event {
            PeerEvent::Joined => vec![ClientMessage::info("opponent connected")],
            PeerEvent::Left => {
                // a peer that left mid-handoff will never answer the request
                self.awaiting_state = false;
                vec![ClientMessage::info("opponent disconnected")]
            }
            PeerEvent::StateRequest => {
                self.send_peer(PeerEvent::MirrorSync(self.mirror.clone()));
                Vec::new()
            }
            PeerEvent::BoardSync { slot, board } => {
                *self.mirror.board_mut(slot) = board;
                self.try_begin()
            }
            PeerEvent::MirrorSync(mirror) => {
                self.mirror = mirror;
                if self.awaiting_state {
                    self.awaiting_state = false;
                    self.handoff_summary()
                } else {
                    Vec::new()
                }
            }
            PeerEvent::Forward(message) => vec![message],
        }
    }

    // Clean leaves free the slot; a dropped transport keeps it claimed so
    // nobody can take the seat over while the player's network flaps
    pub fn disconnect(&self, clean: bool) {
        if !clean {
            info!(
                "player {} lost connection to battle {}",
                self.player_id, self.address
            );
            return;
        }
        info!("player {} left battle {}", self.player_id, self.address);
        if let Some(LeaveOutcome::OpponentRemains {
            channel: Some(channel),
        }) = self.store.leave(&self.address, self.slot, self.player_id)
        {
            self.relay.send(channel, PeerEvent::Left);
        }
    }

    // The store row is the only truth about the phase; read it fresh for
    // every command instead of trusting anything cached here
    fn battle(&self) -> Result<Battle, CommandError> {
        match self.store.battle(&self.address) {
            Some(battle) => Ok(battle),
            None => {
                error!(
                    "battle {} vanished under player {}",
                    self.address, self.player_id
                );
                Err(CommandError::WrongPhase)
            }
        }
    }

    fn load_fleet(&mut self, ships: &Value) -> Result<Vec<ClientMessage>, CommandError> {
        if self.battle()?.phase() != BattlePhase::Preparation {
            return Err(CommandError::WrongPhase);
        }

        let fleet = match validate_fleet(ships) {
            Ok(fleet) => fleet,
            Err(err) => {
                // a bad resubmission withdraws the fleet that was loaded
                if self.mirror.board(self.slot).has_fleet() {
                    self.mirror.board_mut(self.slot).clear_fleet();
                    self.sync_own_board();
                    self.forward(ClientMessage::info("opponent not ready"));
                }
                return Err(err.into());
            }
        };

        self.mirror.board_mut(self.slot).install_fleet(fleet);
        self.sync_own_board();

        let mut replies = vec![ClientMessage::success("fleet loaded")];
        if self.mirror.board(self.slot.other()).has_fleet() {
            replies.push(ClientMessage::info("opponent ready"));
        }
        replies.extend(self.try_begin());
        Ok(replies)
    }

    fn take_shot(&mut self, x: &Value, y: &Value) -> Result<Vec<ClientMessage>, CommandError> {
        let battle = self.battle()?;
        if battle.phase() != BattlePhase::Progress {
            return Err(CommandError::WrongPhase);
        }
        if battle.whose_move != Some(self.slot) {
            return Err(CommandError::NotYourMove);
        }
        let (x, y) = match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => (x, y),
            _ => return Err(CommandError::InvalidShot),
        };

        let outcome = resolve_shot(self.mirror.board_mut(self.slot.other()), x, y);
        if outcome == ShotOutcome::Invalid {
            return Err(CommandError::InvalidShot);
        }

        // the peer actor adopts the mirror before its client hears about
        // the change; both deliveries ride the same ordered channel
        self.send_peer(PeerEvent::MirrorSync(self.mirror.clone()));
        let view = PlayerView::censored(self.mirror.board(self.slot.other()));
        self.forward(ClientMessage::ChangedOwnField(view.clone()));
        let mut replies = vec![ClientMessage::ChangedOpponentField(view)];

        if self.mirror.board(self.slot.other()).defeated() {
            if self.store.finish(&self.address, self.slot) {
                replies.extend(self.announce_end(self.slot));
            }
            return Ok(replies);
        }

        match outcome {
            ShotOutcome::Miss => {
                if self.store.pass_move(&self.address, self.slot) {
                    self.forward(ClientMessage::YourMove);
                }
            }
            // a surrender can land while the shot is in flight; confirm the
            // retained move against the store like the passed one
            _ => {
                if self.store.holds_move(&self.address, self.slot) {
                    replies.push(ClientMessage::YourMove);
                }
            }
        }
        Ok(replies)
    }

    fn surrender(&mut self) -> Result<Vec<ClientMessage>, CommandError> {
        if self.battle()?.phase() != BattlePhase::Progress {
            return Err(CommandError::WrongPhase);
        }
        let winner = self.slot.other();
        if !self.store.finish(&self.address, winner) {
            return Err(CommandError::WrongPhase);
        }
        info!("player {} surrendered battle {}", self.player_id, self.address);
        Ok(self.announce_end(winner))
    }

    // Fires the preparation-to-progress transition. The store call is the
    // arbiter: with both submissions racing, exactly one actor gets true
    // here and announces the start to both clients.
    fn try_begin(&mut self) -> Vec<ClientMessage> {
        if !self.mirror.both_ready() || !self.store.begin(&self.address) {
            return Vec::new();
        }
        self.forward(ClientMessage::State {
            phase: BattlePhase::Progress,
        });
        let mut replies = vec![ClientMessage::State {
            phase: BattlePhase::Progress,
        }];
        if self.slot == PlayerSlot::First {
            replies.push(ClientMessage::YourMove);
        } else {
            self.forward(ClientMessage::YourMove);
        }
        replies
    }

    fn announce_end(&self, winner: PlayerSlot) -> Vec<ClientMessage> {
        let result = if winner == self.slot {
            GameResult::Win
        } else {
            GameResult::Lose
        };
        let peer_result = if winner == self.slot {
            GameResult::Lose
        } else {
            GameResult::Win
        };
        let own = PlayerView::owned(self.mirror.board(self.slot));
        let opponent = PlayerView::owned(self.mirror.board(self.slot.other()));

        self.forward(ClientMessage::State {
            phase: BattlePhase::Over,
        });
        self.forward(ClientMessage::EndGame {
            result: peer_result,
            own: opponent.clone(),
            opponent: own.clone(),
        });
        vec![
            ClientMessage::State {
                phase: BattlePhase::Over,
            },
            ClientMessage::EndGame {
                result,
                own,
                opponent,
            },
        ]
    }

    // Everything a rejoining client needs to resume: both board views,
    // readiness implied by the ship lists, and the turn if it holds one
    fn handoff_summary(&self) -> Vec<ClientMessage> {
        let mut replies = vec![ClientMessage::ProgressSummary {
            own: PlayerView::owned(self.mirror.board(self.slot)),
            opponent: PlayerView::censored(self.mirror.board(self.slot.other())),
        }];
        if let Some(battle) = self.store.battle(&self.address) {
            if battle.phase() == BattlePhase::Progress && battle.whose_move == Some(self.slot) {
                replies.push(ClientMessage::YourMove);
            }
        }
        replies
    }

    fn sync_own_board(&self) {
        self.send_peer(PeerEvent::BoardSync {
            slot: self.slot,
            board: self.mirror.board(self.slot).clone(),
        });
    }

    fn send_peer(&self, event: PeerEvent) {
        match self.store.peer_channel(&self.address, self.slot) {
            Some(channel) => self.relay.send(channel, event),
            None => debug!("player {} has no peer, event dropped", self.player_id),
        }
    }

    fn forward(&self, message: ClientMessage) {
        self.send_peer(PeerEvent::Forward(message));
    }
}
