//! Messaging gateway abstraction for Turncoat.
//!
//! The engine talks to players through a chat platform it knows nothing
//! about. [`Gateway`] is the contract: send to a room, send privately,
//! edit a previously sent message. Implementations live with the bot.
//!
//! Delivery is best-effort. A slow or failing chat API must never stall
//! or revert a game transition, so the engine always calls the gateway
//! through [`deliver`] and [`revise`], which log failures and swallow them.
//!
//! # Feature Flags
//!
//! - `memory` (default): [`RecordingGateway`], an in-memory gateway that
//!   records everything it is asked to send. Used by tests and demos.

mod error;
#[cfg(feature = "memory")]
mod memory;

pub use error::GatewayError;
#[cfg(feature = "memory")]
pub use memory::{Edit, RecordingGateway, Sent};

use std::future::Future;

use turncoat_protocol::{Audience, Choice, MessageHandle, Notice, PlayerId, RoomId};

/// Delivers notices to a chat platform.
///
/// `options` are the interactive choices attached to the message (buttons).
/// The gateway renders them and later reports presses back to the engine
/// using [`Choice::token`].
///
/// Methods return `impl Future + Send` (rather than `async fn`) so the
/// engine can call them from spawned Tokio tasks.
pub trait Gateway: Send + Sync + 'static {
    /// Posts to the room's shared chat.
    fn send_to_room(
        &self,
        room: RoomId,
        notice: &Notice,
        options: &[Choice],
    ) -> impl Future<Output = Result<MessageHandle, GatewayError>> + Send;

    /// Sends a private message to one player.
    fn send_private(
        &self,
        player: PlayerId,
        notice: &Notice,
        options: &[Choice],
    ) -> impl Future<Output = Result<MessageHandle, GatewayError>> + Send;

    /// Replaces the content and options of a message sent earlier.
    fn edit_message(
        &self,
        handle: MessageHandle,
        notice: &Notice,
        options: &[Choice],
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;
}

/// Sends a notice, logging and swallowing any failure.
///
/// Returns the handle of the sent message, or `None` if delivery failed.
pub async fn deliver<G: Gateway>(
    gateway: &G,
    audience: Audience,
    notice: &Notice,
    options: &[Choice],
) -> Option<MessageHandle> {
    let result = match audience {
        Audience::Room(room) => gateway.send_to_room(room, notice, options).await,
        Audience::Player(player) => gateway.send_private(player, notice, options).await,
    };
    match result {
        Ok(handle) => {
            tracing::trace!(%audience, %handle, "notice delivered");
            Some(handle)
        }
        Err(e) => {
            tracing::warn!(%audience, error = %e, "notice delivery failed");
            None
        }
    }
}

/// Edits a message, logging and swallowing any failure.
///
/// Returns `true` if the edit went through.
pub async fn revise<G: Gateway>(
    gateway: &G,
    handle: MessageHandle,
    notice: &Notice,
    options: &[Choice],
) -> bool {
    match gateway.edit_message(handle, notice, options).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(%handle, error = %e, "message edit failed");
            false
        }
    }
}
