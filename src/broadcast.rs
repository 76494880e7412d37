//! Fan-out from a `Table` to the sessions that care about it, grounded on
//! the teacher's `gameroom::Room::unicast`/`broadcast` pair except routed
//! through `SessionRegistry` instead of an in-room `Vec<Channel<Event>>`,
//! and bounded: a queue that can't keep up kills its connection rather
//! than stalling the table's single command loop (spec §4.6/§5).

use crate::protocol::ServerMessage;
use crate::session::{SessionId, SessionRegistry};
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;

pub struct Broadcast<'a> {
    registry: &'a SessionRegistry,
}

impl<'a> Broadcast<'a> {
    pub fn new(registry: &'a SessionRegistry) -> Self {
        Self { registry }
    }

    /// Delivers to exactly one session. Silently a no-op if the session has
    /// no live attachment — there is nowhere to put the message.
    pub fn unicast(&self, session: SessionId, message: ServerMessage) {
        self.send(session, message);
    }

    /// Delivers the same message to every session in `seats`, skipping
    /// detached ones.
    pub fn broadcast(&self, seats: impl IntoIterator<Item = SessionId>, message: ServerMessage) {
        for session in seats {
            self.send(session, message.clone());
        }
    }

    fn send(&self, session: SessionId, message: ServerMessage) {
        let Some(sender) = self.registry.sender_of(session) else {
            return;
        };
        if let Err(TrySendError::Full(_)) = sender.try_send(message) {
            if let Some(kill) = self.registry.kill_of(session) {
                kill_overflowing(&kill);
            }
        }
    }
}

fn kill_overflowing(kill: &Arc<tokio::sync::Notify>) {
    kill.notify_one();
}
