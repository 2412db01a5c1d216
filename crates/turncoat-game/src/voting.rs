//! Day vote: one poll per day, one vote per active player.

use std::collections::BTreeMap;

use turncoat_protocol::{Audience, Choice, ChoiceOption, Notice, PlayerId, Standing};

use crate::effect::Effects;
use crate::machine::{Ctx, Exit};
use crate::{Effect, GameError, Phase, Poll, Room, Slot};

/// How a closed poll resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tally {
    /// One player had strictly the most votes.
    Banish(PlayerId),
    /// Two or more players tied for the most votes (or nobody voted).
    Hung,
}

/// Counts votes and picks the outcome.
pub fn tally(votes: &BTreeMap<PlayerId, PlayerId>) -> Tally {
    let mut counts: BTreeMap<PlayerId, usize> = BTreeMap::new();
    for target in votes.values() {
        *counts.entry(*target).or_default() += 1;
    }
    let Some(top) = counts.values().copied().max() else {
        return Tally::Hung;
    };
    let mut leaders = counts.iter().filter(|&(_, &n)| n == top).map(|(&id, _)| id);
    match (leaders.next(), leaders.next()) {
        (Some(only), None) => Tally::Banish(only),
        _ => Tally::Hung,
    }
}

impl Room {
    /// Live standings: every active player and the votes against them.
    pub fn standings(&self) -> Vec<Standing> {
        self.players
            .active()
            .map(|p| Standing {
                player: p.id,
                name: p.name.clone(),
                votes: self.votes.values().filter(|&&t| t == p.id).count(),
            })
            .collect()
    }

    fn vote_options(&self) -> Vec<Choice> {
        self.players
            .active()
            .map(|p| Choice::new(self.id, ChoiceOption::Vote(p.id)))
            .collect()
    }

    pub(crate) fn open_poll(&mut self, fx: &mut Effects) {
        self.votes.clear();
        self.poll = Poll::Open { handle: None };
        fx.send(
            Audience::Room(self.id),
            Notice::Poll {
                standings: self.standings(),
                closed: false,
            },
            self.vote_options(),
            Some(Slot::Poll),
        );
        tracing::info!(room_id = %self.id, day = self.day, "poll opened");
    }

    pub(crate) fn refresh_poll(&self, fx: &mut Effects) {
        fx.edit(
            Slot::Poll,
            Notice::Poll {
                standings: self.standings(),
                closed: false,
            },
            self.vote_options(),
        );
    }

    /// Records a vote. Closes the poll once every active player has voted.
    pub fn cast_vote(
        &mut self,
        voter: PlayerId,
        target: PlayerId,
        ctx: &mut Ctx<'_>,
    ) -> Result<Vec<Effect>, GameError> {
        if self.phase != Phase::Day || !self.poll.is_open() {
            return Err(GameError::NoOpenPoll);
        }
        self.players.require(voter)?;
        self.players.require(target)?;
        self.players.require_active(voter)?;
        self.players.require_active(target)?;
        if voter == target {
            return Err(GameError::SelfTarget);
        }
        if self.votes.contains_key(&voter) {
            return Err(GameError::AlreadyVoted(voter));
        }

        self.votes.insert(voter, target);
        tracing::debug!(
            room_id = %self.id,
            %voter,
            %target,
            votes = self.votes.len(),
            "vote cast"
        );

        let mut fx = Effects::default();
        if self.votes.len() >= self.players.active_count() {
            self.close_poll(ctx, &mut fx);
        } else {
            self.refresh_poll(&mut fx);
        }
        Ok(fx.into_vec())
    }

    /// Closes the poll, banishes the leader (if any), and schedules night.
    pub(crate) fn close_poll(&mut self, ctx: &mut Ctx<'_>, fx: &mut Effects) {
        fx.edit(
            Slot::Poll,
            Notice::Poll {
                standings: self.standings(),
                closed: true,
            },
            Vec::new(),
        );
        self.poll = Poll::Closed;
        let outcome = tally(&self.votes);
        self.votes.clear();
        tracing::info!(room_id = %self.id, day = self.day, ?outcome, "poll closed");

        match outcome {
            Tally::Banish(target) => {
                self.banish(target, Exit::Voted, fx);
                if self.settle(fx) {
                    return;
                }
            }
            Tally::Hung => fx.announce(self.id, Notice::HungVote),
        }
        self.schedule_night(ctx, fx);
    }
}
