//! Connection-scoped failures.
//!
//! Nothing here is fatal to the process: each variant tears down at most
//! the offending connection. Request-level rejections (invalid moves, mode
//! changes from the guest) are answered in-band and never surface as
//! errors.

use noughts_protocol::FrameError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("connection lost: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("idle timeout exceeded")]
    IdleTimeout,
}
