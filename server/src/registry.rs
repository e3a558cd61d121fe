//! Session registry and broadcast dispatch.
//!
//! Tracks the (at most two) live sessions and fans events out to them.
//! Each session's outbound channel is drained by its own writer task, so
//! queuing here never blocks on socket I/O.

use bytes::Bytes;
use noughts_protocol::{frame, Role, ServerToClient};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tracing::error;
use uuid::Uuid;

pub const MAX_SESSIONS: usize = 2;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("server full")]
pub struct SessionFull;

#[derive(Debug)]
struct Session {
    id: Uuid,
    role: Role,
    tx: UnboundedSender<Bytes>,
}

#[derive(Debug, Default)]
pub struct Registry {
    sessions: Vec<Session>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a connection and assign its role: the free one of X/O, with X
    /// going to the first seat. Fails when both seats are taken.
    pub fn register(&mut self, tx: UnboundedSender<Bytes>) -> Result<(Uuid, Role), SessionFull> {
        if self.sessions.len() >= MAX_SESSIONS {
            return Err(SessionFull);
        }
        let role = if self.sessions.iter().any(|s| s.role == Role::X) {
            Role::O
        } else {
            Role::X
        };
        let id = Uuid::new_v4();
        self.sessions.push(Session { id, role, tx });
        Ok((id, role))
    }

    /// Remove a session. Returns its role, or `None` if it was already gone.
    pub fn unregister(&mut self, id: Uuid) -> Option<Role> {
        let pos = self.sessions.iter().position(|s| s.id == id)?;
        Some(self.sessions.remove(pos).role)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.sessions.len() >= MAX_SESSIONS
    }

    /// Serialize once and queue on every live session. Returns the ids of
    /// sessions whose writer is gone; a dead receiver never aborts delivery
    /// to the others.
    pub fn broadcast(&self, event: &ServerToClient) -> Vec<Uuid> {
        let framed = match frame::encode(event) {
            Ok(framed) => framed,
            Err(e) => {
                error!(error = %e, "failed to encode broadcast event");
                return Vec::new();
            }
        };
        let mut dead = Vec::new();
        for session in &self.sessions {
            if session.tx.send(framed.clone()).is_err() {
                dead.push(session.id);
            }
        }
        dead
    }

    /// Queue an event for a single session: rejections, role assignment,
    /// mode echoes. A dead receiver is left for its own reader to reap.
    pub fn send_to(&self, id: Uuid, event: &ServerToClient) {
        let Some(session) = self.sessions.iter().find(|s| s.id == id) else {
            return;
        };
        match frame::encode(event) {
            Ok(framed) => {
                let _ = session.tx.send(framed);
            }
            Err(e) => error!(error = %e, "failed to encode event"),
        }
    }
}

/// Queue an event on a channel that never got a registry seat (the
/// `server_full` notice for a third connection).
pub fn send_direct(tx: &UnboundedSender<Bytes>, event: &ServerToClient) {
    match frame::encode(event) {
        Ok(framed) => {
            let _ = tx.send(framed);
        }
        Err(e) => error!(error = %e, "failed to encode event"),
    }
}
