//! Error types for the game rules.

use turncoat_protocol::{ActionKind, PlayerId, RoomId, Timestamp};

use crate::Phase;

/// Why an operation was refused.
///
/// Every variant is a recoverable rejection reported back to whoever
/// asked. None of them leave partial state behind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    /// The operation isn't allowed in the room's current phase.
    #[error("cannot {operation} during {phase}")]
    InvalidPhase {
        operation: &'static str,
        phase: Phase,
    },

    /// Only the room's moderator may do this.
    #[error("player {0} is not the moderator")]
    NotModerator(PlayerId),

    /// The player has been banished (or murdered) and can no longer act
    /// or be acted upon.
    #[error("player {0} is not active")]
    NotActive(PlayerId),

    /// A game already exists for this room.
    #[error("a game is already in progress in room {0}")]
    AlreadyInProgress(RoomId),

    #[error("player {0} already joined")]
    AlreadyJoined(PlayerId),

    #[error("player {0} already voted today")]
    AlreadyVoted(PlayerId),

    /// Tonight's action (or this offer) has already been resolved.
    #[error("this action has already been taken")]
    ActionAlreadyTaken,

    #[error("need at least {needed} players to begin, have {joined}")]
    InsufficientPlayers { needed: usize, joined: usize },

    /// Voting for, or acting on, yourself.
    #[error("you cannot target yourself")]
    SelfTarget,

    /// The interactive choice belongs to a prompt or offer that is no
    /// longer live (the day began, or it was never yours).
    #[error("this prompt has expired")]
    PromptExpired,

    /// No ballot is open right now.
    #[error("there is no open poll")]
    NoOpenPoll,

    /// The action isn't legal for the current traitor count, or the
    /// target isn't eligible for it.
    #[error("{0} is not allowed right now")]
    IllegalAction(ActionKind),

    #[error("no game in room {0}")]
    NoSuchRoom(RoomId),

    #[error("no player {0} in this game")]
    NoSuchPlayer(PlayerId),

    #[error("scheduled time {0} is in the past")]
    ScheduleInPast(Timestamp),

    /// A loaded room violates its invariants and cannot be trusted.
    #[error("room {room} is corrupt: {reason}")]
    CorruptRoom { room: RoomId, reason: String },
}
