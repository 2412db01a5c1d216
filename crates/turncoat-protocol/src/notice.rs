//! Outbound message content.
//!
//! The engine never formats text. Every message it sends is a [`Notice`]:
//! a tagged value carrying exactly the facts the recipient is allowed to
//! see. The gateway turns notices into whatever markup its chat platform
//! uses. This keeps secret information explicit: a private notice to a
//! traitor is a different variant from a public announcement, never the
//! same string with a different recipient.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{PlayerId, Timestamp};

// ---------------------------------------------------------------------------
// Small domain enums shared by notices and choices
// ---------------------------------------------------------------------------

/// The two factions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Faithful,
    Traitor,
}

impl Role {
    /// The opposing faction.
    pub fn opponent(self) -> Role {
        match self {
            Self::Faithful => Self::Traitor,
            Self::Traitor => Self::Faithful,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Faithful => write!(f, "Faithful"),
            Self::Traitor => write!(f, "Traitor"),
        }
    }
}

/// A night action a traitor can choose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    Murder,
    Recruit,
    Blackmail,
}

impl ActionKind {
    /// Token form used inside choice identifiers.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Murder => "murder",
            Self::Recruit => "recruit",
            Self::Blackmail => "blackmail",
        }
    }

    /// Inverse of [`as_str`](Self::as_str).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "murder" => Some(Self::Murder),
            "recruit" => Some(Self::Recruit),
            "blackmail" => Some(Self::Blackmail),
            _ => None,
        }
    }

    /// Recruit and blackmail produce an offer the target must answer.
    pub fn is_offer(self) -> bool {
        matches!(self, Self::Recruit | Self::Blackmail)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A target's answer to a recruit or blackmail offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    Accept,
    Decline,
}

impl Decision {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::Decline => "decline",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "accept" => Some(Self::Accept),
            "decline" => Some(Self::Decline),
            _ => None,
        }
    }
}

/// Why the game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WinReason {
    /// The losing faction has no active members left.
    Elimination,
    /// The losing faction's point total reached zero.
    Bankruptcy,
    /// The moderator ended the game; the larger point total wins.
    ModeratorEnded,
}

/// One row of the live vote standings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    pub player: PlayerId,
    pub name: String,
    pub votes: usize,
}

/// One selectable target in a night-action menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetEntry {
    pub player: PlayerId,
    pub name: String,
    pub points: u64,
}

// ---------------------------------------------------------------------------
// Notice
// ---------------------------------------------------------------------------

/// Semantic content of one outbound message.
///
/// Variants are grouped by who receives them. Room notices are public;
/// private notices are only ever addressed to a single player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Notice {
    // -- Lobby (room) --
    LobbyOpened,
    PlayerJoined { name: String, count: usize },
    GameStarted { players: usize },

    // -- Night (room) --
    NightFalls,
    /// No traitors remain active; nobody is prompted tonight.
    PeacefulNight,
    /// Posted once a recruit or blackmail offer has been answered.
    NightBusinessDone,

    // -- Day (room) --
    DayBegins { day: u32, discussion: bool },
    MurderRevealed { victim: String },
    QuietNight,
    TeamScores { faithful: u64, traitors: u64 },
    /// Timed day: talk now, the vote opens at the scheduled time.
    DiscussionOpened,
    /// The ballot. Edited in place as votes arrive, and once more on close.
    Poll { standings: Vec<Standing>, closed: bool },
    HungVote,
    Banished { name: String, role: Role },
    PlayerRemoved { name: String, role: Role },
    /// A banished/removed player's balance moved to the opposing faction.
    PointsMoved { from: String, amount: u64, to: Role },

    // -- Scheduling (room) --
    NightScheduled { at: Timestamp },
    DayScheduled { at: Timestamp },
    TimedDayScheduled { transition_at: Timestamp, vote_at: Timestamp },
    ScheduleOverridden,

    // -- End (room) --
    GameOver {
        winner: Role,
        reason: WinReason,
        traitors: Vec<String>,
        faithful_points: u64,
        traitor_points: u64,
    },

    // -- Private --
    RoleAssigned { role: Role, points: u64, traitors: Vec<String> },
    /// The acting traitor's menu. `last_traitor` selects the blackmail menu.
    NightPrompt { actions: Vec<ActionKind>, last_traitor: bool },
    TargetMenu { action: ActionKind, targets: Vec<TargetEntry> },
    NoTargets,
    ActionConfirmed { action: ActionKind, target: String },
    /// Day began before the traitor acted.
    PromptExpired,
    OfferReceived { action: ActionKind, penalty: u64 },
    /// Sent to the target after they answered.
    OfferSettled { action: ActionKind, decision: Decision, penalty: u64 },
    /// Sent to the proposing traitor after the target answered.
    OfferAnswered { action: ActionKind, decision: Decision, target: String },
    /// An interactive choice was refused; `reason` is human-readable.
    Rejected { reason: String },
}

impl Notice {
    /// Whether this notice may only be shown to one player.
    pub fn is_private(&self) -> bool {
        matches!(
            self,
            Self::RoleAssigned { .. }
                | Self::NightPrompt { .. }
                | Self::TargetMenu { .. }
                | Self::NoTargets
                | Self::ActionConfirmed { .. }
                | Self::PromptExpired
                | Self::OfferReceived { .. }
                | Self::OfferSettled { .. }
                | Self::OfferAnswered { .. }
                | Self::Rejected { .. }
        )
    }
}
