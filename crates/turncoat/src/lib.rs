//! # Turncoat
//!
//! Session engine for a Traitors-style social deduction game played in
//! group chats.
//!
//! A chat room hosts one game at a time. Players join a lobby, a hidden
//! minority become Traitors, and the game alternates between nights (one
//! traitor murders, recruits, or blackmails) and days (everyone votes to
//! banish a suspect). Each faction holds points; banishments move them
//! across. A faction with no points or no members loses.
//!
//! The engine owns the rules, the per-room state, the timers that move
//! rooms between phases, and crash recovery. The chat platform is plugged
//! in through [`Gateway`](turncoat_gateway::Gateway).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use turncoat::prelude::*;
//!
//! # async fn demo() -> Result<(), TurncoatError> {
//! turncoat::init_logging();
//! let engine = TurncoatBuilder::new().build(RecordingGateway::new()).await?;
//!
//! let room = RoomId(-100);
//! engine.execute(room, PlayerId(1), Command::StartGame).await?;
//! engine.execute(room, PlayerId(1), Command::Join { name: "Ada".into() }).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Crates
//!
//! - `turncoat-protocol`: identities, notices, choice tokens, codecs
//! - `turncoat-gateway`: the chat platform contract
//! - `turncoat-game`: the rules, pure and synchronous
//! - `turncoat-timer`: per-room wall-clock timers
//! - `turncoat-session`: room actors, persistence, recovery

mod engine;
mod error;

pub use engine::{Command, Turncoat, TurncoatBuilder};
pub use error::TurncoatError;

/// Installs a `tracing` subscriber that writes to stderr.
///
/// The filter comes from `RUST_LOG`, defaulting to `info`. Calling this
/// twice is harmless; the second call does nothing.
pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Everything a host needs in one import.
pub mod prelude {
    pub use crate::{Command, Turncoat, TurncoatBuilder, TurncoatError, init_logging};

    pub use turncoat_game::{GameConfig, GameError, Phase, Room};
    pub use turncoat_gateway::{Gateway, GatewayError, RecordingGateway};
    pub use turncoat_protocol::{
        ActionKind, Audience, Choice, ChoiceOption, Decision, MessageHandle, Notice, PlayerId,
        Role, RoomId, Timestamp, WinReason,
    };
    pub use turncoat_session::{
        FileStoreConfig, JsonFileStore, MemoryPersistence, Persistence, StoreConfig, StoreError,
    };
    pub use turncoat_timer::TimerConfig;
}
