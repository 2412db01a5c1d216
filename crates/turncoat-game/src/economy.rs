//! Point economy.
//!
//! All arithmetic is integer. An amount split among several recipients is
//! divided evenly and the remainder is lost, so team totals only ever
//! shrink by less than the number of recipients per transfer.

use turncoat_protocol::{PlayerId, Role};

use crate::Roster;

/// Result of moving a player's balance to the opposing faction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Forfeit {
    /// Balance taken from the player.
    pub amount: u64,
    /// Faction that received it.
    pub to: Role,
    /// Number of active members it was split among.
    pub recipients: usize,
    /// What each of them received.
    pub share: u64,
}

impl Forfeit {
    /// Points that reached a recipient; the rest was lost to rounding.
    pub fn credited(&self) -> u64 {
        self.share * self.recipients as u64
    }
}

/// Even share of `amount` over `recipients`. Zero recipients get nothing.
pub fn split(amount: u64, recipients: usize) -> u64 {
    if recipients == 0 {
        return 0;
    }
    amount / recipients as u64
}

/// Sum of points held by a faction's active members.
pub fn team_total(roster: &Roster, role: Role) -> u64 {
    roster.active_as(role).map(|p| p.points).sum()
}

/// Gives every member of each faction its share of `pool`.
///
/// Run once at `begin`, after roles are dealt.
pub fn allocate_starting(roster: &mut Roster, pool: u64) {
    for role in [Role::Faithful, Role::Traitor] {
        let share = split(pool, roster.count_active_as(role));
        for player in roster.iter_mut().filter(|p| p.role == Some(role)) {
            player.points = share;
        }
    }
}

/// Splits `amount` among the active members of `role`.
///
/// Returns `(recipients, share)`.
pub fn credit_faction(roster: &mut Roster, role: Role, amount: u64) -> (usize, u64) {
    let recipients = roster.count_active_as(role);
    let share = split(amount, recipients);
    for player in roster.iter_mut().filter(|p| p.is_active_as(role)) {
        player.points += share;
    }
    (recipients, share)
}

/// Zeroes `from`'s balance and credits it to the opposing faction.
///
/// Used for banishment, removal, and murder. The caller marks the player
/// banished first so they are not counted among their own team's
/// recipients. Returns `None` if the player has no role.
pub fn forfeit(roster: &mut Roster, from: PlayerId) -> Option<Forfeit> {
    let player = roster.get_mut(from)?;
    let to = player.role?.opponent();
    let amount = std::mem::take(&mut player.points);
    let (recipients, share) = credit_faction(roster, to, amount);
    tracing::debug!(player = %from, amount, %to, recipients, share, "points forfeited");
    Some(Forfeit {
        amount,
        to,
        recipients,
        share,
    })
}

/// Moves up to `amount` from one player to another, capped at the
/// payer's balance. Returns what actually moved.
pub fn transfer(roster: &mut Roster, from: PlayerId, to: PlayerId, amount: u64) -> u64 {
    if !roster.contains(to) {
        return 0;
    }
    let Some(payer) = roster.get_mut(from) else {
        return 0;
    };
    let moved = amount.min(payer.points);
    payer.points -= moved;
    if let Some(payee) = roster.get_mut(to) {
        payee.points += moved;
    }
    moved
}
