//! Phase state machine.
//!
//! Every public operation on [`Room`] follows the same contract: it either
//! returns `Err` having changed nothing the caller can observe, or returns
//! `Ok` with the effects the session layer must carry out. Callers that
//! need strict all-or-nothing run operations on a clone and commit on
//! success.
//!
//! ```text
//!            begin                  trigger day / vote timer
//!   LOBBY ─────────→ NIGHT ───────────────────────────────→ DAY
//!                      ↑   transition timer (discussion)      │
//!                      │                                      │ poll closes
//!                      └──────── night timer / start_night ───┘
//! ```
//!
//! The win evaluator runs after every point transfer, banishment,
//! removal, and conversion. A win closes the room from any phase.

use rand::RngCore;
use turncoat_protocol::{ChoiceOption, MessageHandle, Notice, PlayerId, Role, RoomId, Timestamp};

use crate::draft;
use crate::economy::{self, team_total};
use crate::effect::Effects;
use crate::win::{self, Verdict};
use crate::{Effect, GameConfig, GameError, Phase, Poll, Room, Slot, TimerKind};

/// Everything an operation needs besides the room itself.
pub struct Ctx<'a> {
    pub config: &'a GameConfig,
    /// Wall-clock time of the request.
    pub now: Timestamp,
    /// The room's random source.
    pub rng: &'a mut dyn RngCore,
}

impl<'a> Ctx<'a> {
    pub fn new(config: &'a GameConfig, now: Timestamp, rng: &'a mut dyn RngCore) -> Self {
        Self { config, now, rng }
    }
}

/// How a player left the game, for the announcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Exit {
    Voted,
    Removed,
}

impl Room {
    // -----------------------------------------------------------------------
    // Lobby
    // -----------------------------------------------------------------------

    /// Opens a lobby moderated by `moderator`.
    ///
    /// Whether a game already exists in the chat is the store's concern.
    pub fn open(id: RoomId, moderator: PlayerId) -> (Room, Vec<Effect>) {
        let room = Room::new(id, moderator);
        let mut fx = Effects::default();
        fx.announce(id, Notice::LobbyOpened);
        tracing::info!(room_id = %id, %moderator, "lobby opened");
        (room, fx.into_vec())
    }

    pub fn join(&mut self, player: PlayerId, name: &str) -> Result<Vec<Effect>, GameError> {
        if !self.phase.is_joinable() {
            return Err(self.wrong_phase("join"));
        }
        if !self.players.insert(crate::Player::new(player, name)) {
            return Err(GameError::AlreadyJoined(player));
        }

        let mut fx = Effects::default();
        fx.announce(
            self.id,
            Notice::PlayerJoined {
                name: name.to_string(),
                count: self.players.len(),
            },
        );
        tracing::debug!(room_id = %self.id, %player, count = self.players.len(), "player joined");
        Ok(fx.into_vec())
    }

    /// Deals roles and points, then falls straight into the first night.
    pub fn begin(&mut self, requester: PlayerId, ctx: &mut Ctx<'_>) -> Result<Vec<Effect>, GameError> {
        if self.phase != Phase::Lobby {
            return Err(self.wrong_phase("begin"));
        }
        self.require_moderator(requester)?;
        let joined = self.players.len();
        if joined < ctx.config.min_players {
            return Err(GameError::InsufficientPlayers {
                needed: ctx.config.min_players,
                joined,
            });
        }

        let count = draft::traitor_count(joined, ctx.config.max_traitors);
        let traitors = draft::pick_traitors(ctx.rng, &self.players.ids(), count);
        for player in self.players.iter_mut() {
            player.role = Some(if traitors.contains(&player.id) {
                Role::Traitor
            } else {
                Role::Faithful
            });
        }
        economy::allocate_starting(&mut self.players, ctx.config.team_starting_points);

        let mut fx = Effects::default();
        fx.announce(self.id, Notice::GameStarted { players: joined });
        let traitor_names = self.players.names_as(Role::Traitor);
        for player in self.players.iter() {
            let Some(role) = player.role else { continue };
            let traitors = match role {
                Role::Traitor => traitor_names.clone(),
                Role::Faithful => Vec::new(),
            };
            fx.tell(
                player.id,
                Notice::RoleAssigned {
                    role,
                    points: player.points,
                    traitors,
                },
            );
        }
        tracing::info!(room_id = %self.id, players = joined, traitors = count, "game begun");

        self.open_night(ctx, &mut fx);
        Ok(fx.into_vec())
    }

    // -----------------------------------------------------------------------
    // Day
    // -----------------------------------------------------------------------

    /// Moderator override: move to the vote now.
    ///
    /// From night this runs the full dawn (reveal, scores, poll). From a
    /// day discussion it only opens the poll. Pending vote and transition
    /// timers are cancelled.
    pub fn trigger_day_immediate(
        &mut self,
        requester: PlayerId,
        _ctx: &mut Ctx<'_>,
    ) -> Result<Vec<Effect>, GameError> {
        let from_night = self.phase == Phase::Night;
        let in_discussion = self.phase == Phase::Day && self.poll == Poll::Idle;
        if !from_night && !in_discussion {
            return Err(self.wrong_phase("trigger the day"));
        }
        self.require_moderator(requester)?;

        let mut fx = Effects::default();
        let had_vote = self.cancel_timer(TimerKind::Vote, &mut fx);
        let had_transition = self.cancel_timer(TimerKind::Transition, &mut fx);
        if had_vote || had_transition {
            fx.announce(self.id, Notice::ScheduleOverridden);
        }

        if from_night {
            self.open_day(false, &mut fx);
        } else {
            self.open_poll(&mut fx);
        }
        Ok(fx.into_vec())
    }

    /// Schedules the day for `fire_at`.
    ///
    /// If that is more than the timed-mode threshold away, the wait is
    /// split: discussion starts at the midpoint and the vote opens at
    /// `fire_at`. Otherwise a single vote timer is armed.
    pub fn trigger_day_timed(
        &mut self,
        requester: PlayerId,
        fire_at: Timestamp,
        ctx: &mut Ctx<'_>,
    ) -> Result<Vec<Effect>, GameError> {
        if self.phase != Phase::Night {
            return Err(self.wrong_phase("schedule the day"));
        }
        self.require_moderator(requester)?;
        if fire_at <= ctx.now {
            return Err(GameError::ScheduleInPast(fire_at));
        }

        let mut fx = Effects::default();
        let lead = fire_at.saturating_duration_since(ctx.now);
        if lead > ctx.config.timed_mode_threshold {
            let transition_at = ctx.now.midpoint(fire_at);
            self.arm_timer(TimerKind::Transition, transition_at, &mut fx);
            self.arm_timer(TimerKind::Vote, fire_at, &mut fx);
            fx.announce(
                self.id,
                Notice::TimedDayScheduled {
                    transition_at,
                    vote_at: fire_at,
                },
            );
        } else {
            self.cancel_timer(TimerKind::Transition, &mut fx);
            self.arm_timer(TimerKind::Vote, fire_at, &mut fx);
            fx.announce(self.id, Notice::DayScheduled { at: fire_at });
        }
        tracing::info!(room_id = %self.id, %fire_at, ?lead, "day scheduled");
        Ok(fx.into_vec())
    }

    /// Dawn: expire the night prompt, reveal the night, post the scores,
    /// then either open the poll or open discussion.
    pub(crate) fn open_day(&mut self, discussion: bool, fx: &mut Effects) {
        if let Some(prompt) = self.night_prompt.take() {
            if !prompt.is_resolved() {
                fx.edit(Slot::NightPrompt, Notice::PromptExpired, Vec::new());
            }
        }
        self.phase = Phase::Day;
        self.day += 1;
        self.votes.clear();
        self.poll = Poll::Idle;

        fx.announce(
            self.id,
            Notice::DayBegins {
                day: self.day,
                discussion,
            },
        );
        let reveal = match self.pending_murder.take() {
            Some(victim) => Notice::MurderRevealed {
                victim: self.players.name_of(victim),
            },
            None => Notice::QuietNight,
        };
        fx.announce(self.id, reveal);
        self.announce_scores(fx);
        tracing::info!(room_id = %self.id, day = self.day, discussion, "day begun");

        if discussion {
            fx.announce(self.id, Notice::DiscussionOpened);
        } else {
            self.open_poll(fx);
        }
    }

    // -----------------------------------------------------------------------
    // Night
    // -----------------------------------------------------------------------

    /// Moderator override: starts the next night without waiting for the
    /// night timer. Valid once the day's vote has resolved.
    pub fn start_night(
        &mut self,
        requester: PlayerId,
        ctx: &mut Ctx<'_>,
    ) -> Result<Vec<Effect>, GameError> {
        if self.phase != Phase::Day || self.poll != Poll::Closed {
            return Err(self.wrong_phase("start the night"));
        }
        self.require_moderator(requester)?;
        let mut fx = Effects::default();
        self.cancel_timer(TimerKind::NightStart, &mut fx);
        self.enter_night(ctx, &mut fx);
        Ok(fx.into_vec())
    }

    fn enter_night(&mut self, ctx: &mut Ctx<'_>, fx: &mut Effects) {
        if let Some(verdict) = win::check_elimination(&self.players) {
            self.finish(verdict, fx);
            return;
        }
        self.open_night(ctx, fx);
    }

    /// Arms the night timer after a vote resolved.
    pub(crate) fn schedule_night(&mut self, ctx: &Ctx<'_>, fx: &mut Effects) {
        let at = ctx.now + ctx.config.night_delay;
        self.arm_timer(TimerKind::NightStart, at, fx);
        fx.announce(self.id, Notice::NightScheduled { at });
    }

    // -----------------------------------------------------------------------
    // Timers
    // -----------------------------------------------------------------------

    /// A scheduled timer fired.
    ///
    /// Fires that don't match the schedule (re-armed or cancelled since)
    /// are ignored, as are fires whose transition no longer applies.
    pub fn timer_fired(
        &mut self,
        kind: TimerKind,
        fired_at: Timestamp,
        ctx: &mut Ctx<'_>,
    ) -> Result<Vec<Effect>, GameError> {
        if self.schedule.get(kind) != Some(fired_at) {
            tracing::debug!(room_id = %self.id, %kind, %fired_at, "stale timer ignored");
            return Ok(Vec::new());
        }
        self.schedule.set(kind, None);

        let mut fx = Effects::default();
        match (kind, self.phase, self.poll) {
            (TimerKind::Vote, Phase::Night, _) => self.open_day(false, &mut fx),
            (TimerKind::Vote, Phase::Day, Poll::Idle) => self.open_poll(&mut fx),
            (TimerKind::Transition, Phase::Night, _) => self.open_day(true, &mut fx),
            (TimerKind::NightStart, Phase::Day, Poll::Closed) => self.enter_night(ctx, &mut fx),
            (_, phase, _) => {
                tracing::debug!(room_id = %self.id, %kind, %phase, "timer no longer applies");
            }
        }
        Ok(fx.into_vec())
    }

    pub(crate) fn arm_timer(&mut self, kind: TimerKind, at: Timestamp, fx: &mut Effects) {
        self.schedule.set(kind, Some(at));
        fx.arm(kind, at);
    }

    /// Returns `true` if a timer of this kind was armed.
    pub(crate) fn cancel_timer(&mut self, kind: TimerKind, fx: &mut Effects) -> bool {
        if self.schedule.get(kind).is_none() {
            return false;
        }
        self.schedule.set(kind, None);
        fx.cancel(kind);
        true
    }

    // -----------------------------------------------------------------------
    // Moderation
    // -----------------------------------------------------------------------

    /// Banishes a player outside the vote.
    ///
    /// Their balance moves to the opposing faction, any votes by or for
    /// them are withdrawn, and offers involving them lapse. If that leaves
    /// every remaining player having voted, the poll closes.
    pub fn remove_player(
        &mut self,
        requester: PlayerId,
        target: PlayerId,
        ctx: &mut Ctx<'_>,
    ) -> Result<Vec<Effect>, GameError> {
        if !self.phase.is_running() {
            return Err(self.wrong_phase("remove a player"));
        }
        self.require_moderator(requester)?;
        self.players.require_active(target)?;

        let mut fx = Effects::default();
        self.banish(target, Exit::Removed, &mut fx);
        self.votes
            .retain(|voter, choice| *voter != target && *choice != target);
        self.offers
            .retain(|o| o.settled || (o.target != target && o.proposer != target));
        if let Some(prompt) = self.night_prompt.as_mut() {
            if prompt.actor == target && !prompt.is_resolved() {
                prompt.stage = crate::PromptStage::Resolved;
                fx.edit(Slot::NightPrompt, Notice::PromptExpired, Vec::new());
            }
        }
        tracing::info!(room_id = %self.id, player = %target, "player removed");

        if self.settle(&mut fx) {
            return Ok(fx.into_vec());
        }
        if self.poll.is_open() {
            if self.votes.len() >= self.players.active_count() {
                self.close_poll(ctx, &mut fx);
            } else {
                self.refresh_poll(&mut fx);
            }
        }
        Ok(fx.into_vec())
    }

    /// Ends the game on the moderator's word. The larger point total wins.
    pub fn end_game(&mut self, requester: PlayerId) -> Result<Vec<Effect>, GameError> {
        self.require_moderator(requester)?;
        let mut fx = Effects::default();
        self.finish(win::by_totals(&self.players), &mut fx);
        Ok(fx.into_vec())
    }

    /// Marks a player banished and moves their balance to the other side.
    pub(crate) fn banish(&mut self, target: PlayerId, exit: Exit, fx: &mut Effects) {
        let Some(player) = self.players.get_mut(target) else {
            return;
        };
        player.status = crate::Status::Banished;
        let name = player.name.clone();

        if let Some(role) = player.role {
            let notice = match exit {
                Exit::Voted => Notice::Banished {
                    name: name.clone(),
                    role,
                },
                Exit::Removed => Notice::PlayerRemoved {
                    name: name.clone(),
                    role,
                },
            };
            fx.announce(self.id, notice);
        }
        if let Some(forfeit) = economy::forfeit(&mut self.players, target) {
            if forfeit.amount > 0 && forfeit.recipients > 0 {
                fx.announce(
                    self.id,
                    Notice::PointsMoved {
                        from: name,
                        amount: forfeit.amount,
                        to: forfeit.to,
                    },
                );
            }
        }
        self.announce_scores(fx);
    }

    // -----------------------------------------------------------------------
    // Interactive choices
    // -----------------------------------------------------------------------

    /// Routes a pressed option to the operation it belongs to.
    pub fn choose(
        &mut self,
        actor: PlayerId,
        option: ChoiceOption,
        ctx: &mut Ctx<'_>,
    ) -> Result<Vec<Effect>, GameError> {
        match option {
            ChoiceOption::Vote(target) => self.cast_vote(actor, target, ctx),
            ChoiceOption::Action(action) => self.choose_action(actor, action),
            ChoiceOption::Target(action, target) => self.choose_target(actor, action, target, ctx),
            ChoiceOption::Offer {
                action,
                decision,
                proposer,
            } => self.answer_offer(actor, action, decision, proposer, ctx),
        }
    }

    /// Records the delivered handle of a tracked message.
    pub fn record_handle(&mut self, slot: Slot, handle: MessageHandle) {
        match slot {
            Slot::Poll => {
                if let Poll::Open { handle: tracked } = &mut self.poll {
                    *tracked = Some(handle);
                }
            }
            Slot::NightPrompt => {
                if let Some(prompt) = self.night_prompt.as_mut() {
                    prompt.handle = Some(handle);
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Endgame
    // -----------------------------------------------------------------------

    /// Runs the win evaluator. Returns `true` if the game ended.
    pub(crate) fn settle(&mut self, fx: &mut Effects) -> bool {
        match win::evaluate(&self.players) {
            Some(verdict) => {
                self.finish(verdict, fx);
                true
            }
            None => false,
        }
    }

    fn finish(&mut self, verdict: Verdict, fx: &mut Effects) {
        for kind in TimerKind::ALL {
            self.cancel_timer(kind, fx);
        }
        if let Some(prompt) = self.night_prompt.take() {
            if !prompt.is_resolved() {
                fx.edit(Slot::NightPrompt, Notice::PromptExpired, Vec::new());
            }
        }
        if self.poll.is_open() {
            fx.edit(
                Slot::Poll,
                Notice::Poll {
                    standings: self.standings(),
                    closed: true,
                },
                Vec::new(),
            );
            self.poll = Poll::Closed;
            self.votes.clear();
        }

        let faithful_points = team_total(&self.players, Role::Faithful);
        let traitor_points = team_total(&self.players, Role::Traitor);
        fx.announce(
            self.id,
            Notice::GameOver {
                winner: verdict.winner,
                reason: verdict.reason,
                traitors: self.players.names_as(Role::Traitor),
                faithful_points,
                traitor_points,
            },
        );
        fx.close();
        tracing::info!(
            room_id = %self.id,
            winner = %verdict.winner,
            reason = ?verdict.reason,
            faithful_points,
            traitor_points,
            "game over"
        );
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    pub(crate) fn announce_scores(&self, fx: &mut Effects) {
        fx.announce(
            self.id,
            Notice::TeamScores {
                faithful: self.team_total(Role::Faithful),
                traitors: self.team_total(Role::Traitor),
            },
        );
    }

    fn require_moderator(&self, requester: PlayerId) -> Result<(), GameError> {
        if requester != self.moderator {
            return Err(GameError::NotModerator(requester));
        }
        Ok(())
    }

    fn wrong_phase(&self, operation: &'static str) -> GameError {
        GameError::InvalidPhase {
            operation,
            phase: self.phase,
        }
    }
}
