//! Game rules for Turncoat.
//!
//! This crate is pure and synchronous. A [`Room`] holds the complete,
//! serializable state of one game; its operations validate a request,
//! mutate the room, and return the [`Effect`]s (messages, timers, closing)
//! the session layer must carry out. Nothing here touches the network,
//! the clock, or the filesystem: time and randomness come in through
//! [`Ctx`].
//!
//! # Rules in brief
//!
//! - Players join a lobby; the moderator begins once enough have joined.
//! - A few players are secretly Traitors, the rest Faithful. Each faction
//!   splits a starting pool of points evenly.
//! - Each night one traitor may murder, recruit (two or more traitors
//!   left), or blackmail (one traitor left).
//! - Each day the players vote; a single leader is banished and their
//!   points go to the other side. A tie banishes nobody.
//! - A faction with no points, or no active members, loses.

mod config;
mod draft;
mod economy;
mod effect;
mod error;
mod machine;
mod model;
mod night;
mod roster;
mod voting;
mod win;

pub use config::{GameConfig, Phase};
pub use draft::traitor_count;
pub use economy::{Forfeit, split, team_total};
pub use effect::{Effect, Slot};
pub use error::GameError;
pub use machine::Ctx;
pub use model::{NightPrompt, PendingOffer, Poll, PromptStage, Room, Schedule, TimerKind};
pub use night::menu_for;
pub use roster::{Player, Roster, Status};
pub use voting::{Tally, tally};
pub use win::{Verdict, evaluate};
