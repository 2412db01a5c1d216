use turncoat_protocol::{Audience, MessageHandle};

/// Errors a messaging gateway can report.
///
/// The engine never propagates these. They are logged by
/// [`deliver`](crate::deliver) / [`revise`](crate::revise) and the game
/// moves on.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The recipient can't be reached (e.g. the player never opened a
    /// private conversation with the bot).
    #[error("{0} is unreachable")]
    Unreachable(Audience),

    /// The chat platform refused the request.
    #[error("delivery rejected: {0}")]
    Rejected(String),

    /// An edit referenced a message the gateway doesn't know.
    #[error("unknown message {0}")]
    UnknownMessage(MessageHandle),
}
