//! Shared vocabulary for Turncoat.
//!
//! This crate defines the "language" every other layer speaks:
//!
//! - **Types** ([`PlayerId`], [`RoomId`], [`Timestamp`], [`MessageHandle`],
//!   [`Audience`]): identities and addressing.
//! - **Notices** ([`Notice`]): the semantic content of every message the
//!   engine sends. Rendering them into a chat dialect is the gateway's job.
//! - **Choices** ([`ChoiceOption`], [`Choice`]): the interactive option
//!   identifiers the engine issues and later receives back.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how persisted room state
//!   is converted to and from bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! # Architecture
//!
//! ```text
//! Gateway (chat) → Protocol (Choice / Notice) → Game rules → Session store
//! ```
//!
//! Nothing in here knows about rooms' rules or connections. It only knows
//! how things are named and how they are encoded.

mod choice;
mod codec;
mod error;
mod notice;
mod types;

pub use choice::{Choice, ChoiceOption};
pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use notice::{ActionKind, Decision, Notice, Role, Standing, TargetEntry, WinReason};
pub use types::{Audience, MessageHandle, PlayerId, RoomId, Timestamp};
