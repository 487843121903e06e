use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use log::debug;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::models::battle::PlayerSlot;
use crate::models::board::{Mirror, PlayerBoard};
use crate::protocol::ClientMessage;

// Everything one connection can drop into the other connection's mailbox
#[derive(Debug)]
pub enum PeerEvent {
    Joined,
    Left,
    StateRequest,
    BoardSync { slot: PlayerSlot, board: PlayerBoard },
    MirrorSync(Mirror),
    Forward(ClientMessage),
}

// Maps live channel ids to mailbox senders. Channel ids are never reused,
// so an event addressed to a connection that already went away simply finds
// no entry and is dropped instead of reaching the slot's next owner.
#[derive(Clone)]
pub struct Relay {
    inner: Arc<RelayInner>,
}

struct RelayInner {
    next_channel: AtomicU64,
    channels: Mutex<HashMap<u64, UnboundedSender<PeerEvent>>>,
}

impl Relay {
    pub fn new() -> Relay {
        Relay {
            inner: Arc::new(RelayInner {
                next_channel: AtomicU64::new(1),
                channels: Mutex::new(HashMap::new()),
            }),
        }
    }

    fn channels_locked(&self) -> MutexGuard<'_, HashMap<u64, UnboundedSender<PeerEvent>>> {
        self.inner
            .channels
            .lock()
            .unwrap_or_else(|err| err.into_inner())
    }

    pub fn register(&self) -> (u64, UnboundedReceiver<PeerEvent>) {
        let channel = self.inner.next_channel.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.channels_locked().insert(channel, tx);
        (channel, rx)
    }

    pub fn unregister(&self, channel: u64) {
        self.channels_locked().remove(&channel);
    }

    pub fn send(&self, channel: u64, event: PeerEvent) {
        match self.channels_locked().get(&channel) {
            Some(tx) => {
                if tx.send(event).is_err() {
                    debug!("channel {} is closed, event dropped", channel);
                }
            }
            None => debug!("channel {} is gone, event dropped", channel),
        }
    }
}
