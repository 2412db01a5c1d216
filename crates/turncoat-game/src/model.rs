//! Room state: everything that is persisted for one game.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use turncoat_protocol::{ActionKind, MessageHandle, PlayerId, Role, RoomId, Timestamp};

use crate::{GameError, Phase, Roster};

// ---------------------------------------------------------------------------
// Timers
// ---------------------------------------------------------------------------

/// The three kinds of scheduled transition a room can have pending.
/// At most one of each kind is armed at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TimerKind {
    /// Opens the vote (from night, via the immediate day path).
    Vote,
    /// Moves a timed night into the discussion half of the day.
    Transition,
    /// Starts the next night after a vote resolved.
    NightStart,
}

impl TimerKind {
    pub const ALL: [TimerKind; 3] = [Self::Vote, Self::Transition, Self::NightStart];
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vote => write!(f, "vote"),
            Self::Transition => write!(f, "transition"),
            Self::NightStart => write!(f, "night_start"),
        }
    }
}

/// Fire times of the room's pending timers.
///
/// This is the durable record. The live tokio timers are rebuilt from it
/// on startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub vote_at: Option<Timestamp>,
    pub transition_at: Option<Timestamp>,
    pub night_at: Option<Timestamp>,
}

impl Schedule {
    pub fn get(&self, kind: TimerKind) -> Option<Timestamp> {
        match kind {
            TimerKind::Vote => self.vote_at,
            TimerKind::Transition => self.transition_at,
            TimerKind::NightStart => self.night_at,
        }
    }

    pub fn set(&mut self, kind: TimerKind, at: Option<Timestamp>) {
        let slot = match kind {
            TimerKind::Vote => &mut self.vote_at,
            TimerKind::Transition => &mut self.transition_at,
            TimerKind::NightStart => &mut self.night_at,
        };
        *slot = at;
    }

    /// Every armed timer, in [`TimerKind::ALL`] order.
    pub fn armed(&self) -> Vec<(TimerKind, Timestamp)> {
        TimerKind::ALL
            .into_iter()
            .filter_map(|kind| self.get(kind).map(|at| (kind, at)))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Night prompt and offers
// ---------------------------------------------------------------------------

/// How far the prompted traitor has got tonight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PromptStage {
    /// Choosing an action.
    Menu,
    /// Choosing a target for this action.
    Targeting(ActionKind),
    /// Tonight's action is done.
    Resolved,
}

/// The live night prompt of the one traitor chosen to act tonight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NightPrompt {
    pub actor: PlayerId,
    pub stage: PromptStage,
    /// Handle of the private prompt message, once delivered.
    pub handle: Option<MessageHandle>,
}

impl NightPrompt {
    pub fn is_resolved(&self) -> bool {
        self.stage == PromptStage::Resolved
    }
}

/// A recruit or blackmail offer waiting for its target to answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingOffer {
    pub action: ActionKind,
    pub target: PlayerId,
    pub proposer: PlayerId,
    /// Answered offers are kept until the next night so a repeated
    /// answer can be told apart from a stale one.
    #[serde(default)]
    pub settled: bool,
}

// ---------------------------------------------------------------------------
// Poll
// ---------------------------------------------------------------------------

/// The day's ballot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Poll {
    /// No ballot yet today (or not day at all).
    #[default]
    Idle,
    /// Accepting votes. The handle is set once the message is delivered.
    Open { handle: Option<MessageHandle> },
    /// The vote resolved. The room is waiting for nightfall.
    Closed,
}

impl Poll {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open { .. })
    }
}

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// One game, keyed by the chat it runs in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub moderator: PlayerId,
    pub phase: Phase,
    /// Number of days begun so far.
    #[serde(default)]
    pub day: u32,
    pub players: Roster,
    /// Voter to target, for the open poll only.
    #[serde(default)]
    pub votes: BTreeMap<PlayerId, PlayerId>,
    #[serde(default)]
    pub poll: Poll,
    #[serde(default)]
    pub night_prompt: Option<NightPrompt>,
    /// Murdered tonight, revealed at dawn.
    #[serde(default)]
    pub pending_murder: Option<PlayerId>,
    #[serde(default)]
    pub offers: Vec<PendingOffer>,
    #[serde(default)]
    pub schedule: Schedule,
}

impl Room {
    /// A fresh lobby.
    pub fn new(id: RoomId, moderator: PlayerId) -> Self {
        Self {
            id,
            moderator,
            phase: Phase::Lobby,
            day: 0,
            players: Roster::new(),
            votes: BTreeMap::new(),
            poll: Poll::Idle,
            night_prompt: None,
            pending_murder: None,
            offers: Vec::new(),
            schedule: Schedule::default(),
        }
    }

    /// Point total of a faction's active members.
    pub fn team_total(&self, role: Role) -> u64 {
        crate::economy::team_total(&self.players, role)
    }

    /// Checks the invariants a loaded room must satisfy.
    pub fn validate(&self) -> Result<(), GameError> {
        let corrupt = |reason: String| GameError::CorruptRoom {
            room: self.id,
            reason,
        };

        for player in self.players.iter() {
            match (self.phase, player.role) {
                (Phase::Lobby, Some(_)) => {
                    return Err(corrupt(format!("{} has a role in the lobby", player.id)));
                }
                (Phase::Night | Phase::Day, None) => {
                    return Err(corrupt(format!("{} has no role after begin", player.id)));
                }
                _ => {}
            }
            if player.converted && player.role != Some(Role::Traitor) {
                return Err(corrupt(format!("{} converted but not a traitor", player.id)));
            }
        }

        if !self.votes.is_empty() && !self.poll.is_open() {
            return Err(corrupt("votes recorded without an open poll".into()));
        }
        if self.phase != Phase::Day && self.poll != Poll::Idle {
            return Err(corrupt(format!("poll is not idle during {}", self.phase)));
        }
        for (voter, target) in &self.votes {
            for id in [voter, target] {
                if !self.players.get(*id).is_some_and(|p| p.is_active()) {
                    return Err(corrupt(format!("vote involves inactive player {id}")));
                }
            }
            if voter == target {
                return Err(corrupt(format!("{voter} voted for themselves")));
            }
        }

        if let Some(prompt) = &self.night_prompt {
            if self.phase != Phase::Night {
                return Err(corrupt(format!("night prompt during {}", self.phase)));
            }
            let is_traitor = self
                .players
                .get(prompt.actor)
                .is_some_and(|p| p.role == Some(Role::Traitor));
            if !is_traitor {
                return Err(corrupt(format!("{} prompted but not a traitor", prompt.actor)));
            }
        }

        if let Some(victim) = self.pending_murder {
            if self.players.get(victim).is_none_or(|p| p.is_active()) {
                return Err(corrupt(format!("murder victim {victim} is still active")));
            }
        }

        for offer in &self.offers {
            if !offer.action.is_offer() {
                return Err(corrupt(format!("{} is not an offer", offer.action)));
            }
            if !self.players.contains(offer.target) || !self.players.contains(offer.proposer) {
                return Err(corrupt("offer names an unknown player".into()));
            }
        }

        Ok(())
    }
}
