//! Win conditions.

use turncoat_protocol::{Role, WinReason};

use crate::Roster;
use crate::economy::team_total;

/// Who won, and why.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub winner: Role,
    pub reason: WinReason,
}

/// A faction whose active members hold no points loses.
///
/// An empty faction also holds no points; that case is reported as
/// elimination.
pub fn check_points(roster: &Roster) -> Option<Verdict> {
    let verdict = |winner: Role| Verdict {
        winner,
        reason: if roster.count_active_as(winner.opponent()) == 0 {
            WinReason::Elimination
        } else {
            WinReason::Bankruptcy
        },
    };
    if team_total(roster, Role::Traitor) == 0 {
        Some(verdict(Role::Faithful))
    } else if team_total(roster, Role::Faithful) == 0 {
        Some(verdict(Role::Traitor))
    } else {
        None
    }
}

/// A faction with no active members left loses.
pub fn check_elimination(roster: &Roster) -> Option<Verdict> {
    let verdict = |winner| Verdict {
        winner,
        reason: WinReason::Elimination,
    };
    if roster.count_active_as(Role::Traitor) == 0 {
        Some(verdict(Role::Faithful))
    } else if roster.count_active_as(Role::Faithful) == 0 {
        Some(verdict(Role::Traitor))
    } else {
        None
    }
}

/// Points first, then elimination.
pub fn evaluate(roster: &Roster) -> Option<Verdict> {
    check_points(roster).or_else(|| check_elimination(roster))
}

/// The moderator ended the game: the larger total wins, ties go to the
/// faithful.
pub fn by_totals(roster: &Roster) -> Verdict {
    let faithful = team_total(roster, Role::Faithful);
    let traitors = team_total(roster, Role::Traitor);
    Verdict {
        winner: if traitors > faithful {
            Role::Traitor
        } else {
            Role::Faithful
        },
        reason: WinReason::ModeratorEnded,
    }
}
