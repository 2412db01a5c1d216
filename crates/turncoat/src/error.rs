//! Unified error type for the Turncoat engine.

use turncoat_game::GameError;
use turncoat_gateway::GatewayError;
use turncoat_protocol::ProtocolError;
use turncoat_session::{PersistenceError, StoreError};

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum TurncoatError {
    /// A token or state blob could not be understood.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A chat platform call failed. The engine itself never surfaces
    /// these; they come from gateway code the host calls directly.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// A rule violation, reported back to whoever asked.
    #[error(transparent)]
    Game(#[from] GameError),

    /// The session store could not serve the request.
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl TurncoatError {
    /// The rule violation behind this error, wherever it was wrapped.
    pub fn rejection(&self) -> Option<&GameError> {
        match self {
            Self::Game(e) => Some(e),
            Self::Store(e) => e.as_game(),
            _ => None,
        }
    }
}
