//! Error types for the session layer.

use turncoat_game::GameError;
use turncoat_protocol::{ProtocolError, RoomId};

/// Errors from reading or writing the persisted room table.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("state file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The state blob could not be encoded, or what was read back is not a
    /// room table.
    #[error("state codec failed: {0}")]
    Codec(#[from] ProtocolError),
}

/// Errors returned by [`SessionStore`](crate::SessionStore) operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The game rules rejected the request. Recoverable; report it to the
    /// player who asked.
    #[error(transparent)]
    Game(#[from] GameError),

    /// The room's actor is gone (it closed while the request was queued).
    #[error("room {0} is unavailable")]
    Unavailable(RoomId),

    /// An inbound choice token the store never issued.
    #[error("invalid choice: {0}")]
    InvalidChoice(#[from] ProtocolError),

    #[error("persistence failed: {0}")]
    Persistence(#[from] PersistenceError),
}

impl StoreError {
    /// The rule violation behind this error, if that is what it is.
    pub fn as_game(&self) -> Option<&GameError> {
        match self {
            Self::Game(e) => Some(e),
            _ => None,
        }
    }
}
