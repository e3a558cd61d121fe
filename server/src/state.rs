//! Shared server state.
//!
//! The match and the session registry live behind one mutex; every
//! mutation runs inside a single critical section and only queues cloned
//! event payloads, so no socket write ever happens under the lock.

use std::sync::Arc;

use noughts_protocol::{GameMode, ServerToClient};
use parking_lot::{Mutex, MutexGuard};
use tracing::info;
use uuid::Uuid;

use crate::game::{Effect, Match};
use crate::registry::Registry;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<Mutex<Shared>>,
}

pub struct Shared {
    pub registry: Registry,
    pub game: Match,
}

impl AppState {
    pub fn new(mode: GameMode) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Shared {
                registry: Registry::new(),
                game: Match::new(mode),
            })),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, Shared> {
        self.inner.lock()
    }
}

impl Shared {
    /// Route a batch of effects: broadcasts to every live session, replies
    /// to the intent's sender. Sessions whose writer died are dropped here
    /// rather than stalling delivery to the rest.
    pub fn apply_effects(&mut self, sender: Uuid, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Broadcast(event) => {
                    for dead in self.registry.broadcast(&event) {
                        self.drop_session(dead);
                    }
                }
                Effect::Reply(event) => self.registry.send_to(sender, &event),
            }
        }
    }

    /// Unregister a session, run the match's disconnect transition and
    /// notify the survivor. Idempotent: a session already reaped by a
    /// failed broadcast is skipped.
    pub fn drop_session(&mut self, id: Uuid) {
        let Some(role) = self.registry.unregister(id) else {
            return;
        };
        info!(%role, remaining = self.registry.len(), "session unregistered");
        self.game.opponent_left();
        if !self.registry.is_empty() {
            // Survivor's writer can only be reaped by its own reader.
            let _ = self.registry.broadcast(&ServerToClient::OpponentDisconnected);
        }
    }
}
