//! Integration tests for the game rules, driven through `Room` operations.

use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use turncoat_game::{
    Ctx, Effect, GameConfig, GameError, Phase, Poll, PromptStage, Room, Slot, Status, TimerKind,
};
use turncoat_protocol::{
    ActionKind, Audience, ChoiceOption, Decision, Notice, PlayerId, Role, RoomId, Timestamp,
    WinReason,
};

// =========================================================================
// Table: a room plus everything needed to drive it.
// =========================================================================

const MODERATOR: PlayerId = PlayerId(1);
const ROOM: RoomId = RoomId(-100);
const HOUR: Duration = Duration::from_secs(3600);

struct Table {
    room: Room,
    config: GameConfig,
    rng: StdRng,
    now: Timestamp,
}

impl Table {
    fn lobby(players: u64) -> Self {
        let (mut room, _) = Room::open(ROOM, MODERATOR);
        for id in 1..=players {
            room.join(PlayerId(id), &format!("p{id}")).unwrap();
        }
        Self {
            room,
            config: GameConfig::default(),
            rng: StdRng::seed_from_u64(42),
            now: Timestamp(1_000_000),
        }
    }

    fn started(players: u64) -> Self {
        let mut table = Self::lobby(players);
        table.with(|room, ctx| room.begin(MODERATOR, ctx)).unwrap();
        table
    }

    fn with<T>(&mut self, op: impl FnOnce(&mut Room, &mut Ctx<'_>) -> T) -> T {
        let mut ctx = Ctx::new(&self.config, self.now, &mut self.rng);
        op(&mut self.room, &mut ctx)
    }

    fn traitors(&self) -> Vec<PlayerId> {
        self.room.players.active_ids_as(Role::Traitor)
    }

    fn faithful(&self) -> Vec<PlayerId> {
        self.room.players.active_ids_as(Role::Faithful)
    }

    fn actor(&self) -> PlayerId {
        self.room.night_prompt.as_ref().unwrap().actor
    }

    fn points(&self, id: PlayerId) -> u64 {
        self.room.players.get(id).unwrap().points
    }

    fn act(&mut self, action: ActionKind, target: PlayerId) -> Vec<Effect> {
        let actor = self.actor();
        self.with(|room, ctx| {
            room.choose(actor, ChoiceOption::Action(action), ctx)?;
            room.choose(actor, ChoiceOption::Target(action, target), ctx)
        })
        .unwrap()
    }

    fn day(&mut self) -> Vec<Effect> {
        self.with(|room, ctx| room.trigger_day_immediate(MODERATOR, ctx))
            .unwrap()
    }

    fn vote(&mut self, voter: PlayerId, target: PlayerId) -> Result<Vec<Effect>, GameError> {
        self.with(|room, ctx| room.choose(voter, ChoiceOption::Vote(target), ctx))
    }

    fn total_points(&self) -> u64 {
        self.room.team_total(Role::Faithful) + self.room.team_total(Role::Traitor)
    }
}

fn announced(effects: &[Effect], pred: impl Fn(&Notice) -> bool) -> bool {
    effects.iter().any(|e| match e {
        Effect::Send { to: Audience::Room(_), notice, .. } => pred(notice),
        _ => false,
    })
}

fn told(effects: &[Effect], player: PlayerId) -> Vec<&Notice> {
    effects
        .iter()
        .filter_map(|e| match e {
            Effect::Send { to: Audience::Player(p), notice, .. } if *p == player => Some(notice),
            _ => None,
        })
        .collect()
}

fn game_over(effects: &[Effect]) -> Option<(Role, WinReason)> {
    effects.iter().find_map(|e| match e {
        Effect::Send {
            notice: Notice::GameOver { winner, reason, .. },
            ..
        } => Some((*winner, *reason)),
        _ => None,
    })
}

// =========================================================================
// Lobby and begin
// =========================================================================

#[test]
fn test_begin_five_players_one_traitor_even_split() {
    let mut table = Table::lobby(5);
    let effects = table.with(|room, ctx| room.begin(MODERATOR, ctx)).unwrap();

    let traitors = table.traitors();
    assert_eq!(traitors.len(), 1);
    assert_eq!(table.points(traitors[0]), 1000);
    for id in table.faithful() {
        assert_eq!(table.points(id), 250);
    }
    assert_eq!(table.room.phase, Phase::Night);
    assert_eq!(table.actor(), traitors[0]);

    // Only the traitor learns who the traitors are.
    let traitor_name = format!("p{}", traitors[0].0);
    assert!(told(&effects, traitors[0]).iter().any(|n| matches!(
        n,
        Notice::RoleAssigned { role: Role::Traitor, traitors, .. } if *traitors == vec![traitor_name.clone()]
    )));
    for id in table.faithful() {
        assert!(told(&effects, id).iter().any(|n| matches!(
            n,
            Notice::RoleAssigned { role: Role::Faithful, traitors, .. } if traitors.is_empty()
        )));
    }

    // The lone traitor gets the blackmail menu.
    assert!(told(&effects, traitors[0]).iter().any(|n| matches!(
        n,
        Notice::NightPrompt { last_traitor: true, .. }
    )));
}

#[test]
fn test_begin_nine_players_three_traitors() {
    let table = Table::started(9);
    assert_eq!(table.traitors().len(), 3);
    for id in table.traitors() {
        assert_eq!(table.points(id), 333);
    }
}

#[test]
fn test_begin_below_minimum_insufficient_players() {
    let mut table = Table::lobby(2);
    let result = table.with(|room, ctx| room.begin(MODERATOR, ctx));

    assert_eq!(
        result,
        Err(GameError::InsufficientPlayers {
            needed: 3,
            joined: 2
        })
    );
    assert_eq!(table.room.phase, Phase::Lobby);
}

#[test]
fn test_begin_non_moderator_rejected() {
    let mut table = Table::lobby(5);
    let result = table.with(|room, ctx| room.begin(PlayerId(2), ctx));
    assert_eq!(result, Err(GameError::NotModerator(PlayerId(2))));
}

#[test]
fn test_join_twice_or_after_begin_rejected() {
    let mut table = Table::lobby(3);
    assert_eq!(
        table.room.join(PlayerId(2), "again"),
        Err(GameError::AlreadyJoined(PlayerId(2)))
    );

    table.with(|room, ctx| room.begin(MODERATOR, ctx)).unwrap();
    assert!(matches!(
        table.room.join(PlayerId(9), "late"),
        Err(GameError::InvalidPhase { phase: Phase::Night, .. })
    ));
}

// =========================================================================
// Night actions
// =========================================================================

#[test]
fn test_murder_lone_traitor_takes_full_balance() {
    let mut table = Table::started(5);
    let traitor = table.traitors()[0];
    let victim = table.faithful()[0];

    table.act(ActionKind::Murder, victim);

    assert_eq!(table.points(traitor), 1250);
    assert_eq!(table.points(victim), 0);
    assert_eq!(table.room.players.get(victim).unwrap().status, Status::Banished);

    let effects = table.day();
    let name = format!("p{}", victim.0);
    assert!(announced(&effects, |n| matches!(
        n,
        Notice::MurderRevealed { victim } if *victim == name
    )));
    assert_eq!(table.room.pending_murder, None);
}

#[test]
fn test_second_action_same_night_already_taken() {
    let mut table = Table::started(5);
    let victim = table.faithful()[0];
    table.act(ActionKind::Murder, victim);

    let actor = table.actor();
    let result = table.with(|room, ctx| room.choose(actor, ChoiceOption::Action(ActionKind::Murder), ctx));
    assert_eq!(result, Err(GameError::ActionAlreadyTaken));
}

#[test]
fn test_non_prompted_player_prompt_expired() {
    let mut table = Table::started(5);
    let outsider = table.faithful()[0];
    let result = table.with(|room, ctx| {
        room.choose(outsider, ChoiceOption::Action(ActionKind::Murder), ctx)
    });
    assert_eq!(result, Err(GameError::PromptExpired));
}

#[test]
fn test_recruit_illegal_for_last_traitor() {
    let mut table = Table::started(5);
    let actor = table.actor();
    let result = table.with(|room, ctx| {
        room.choose(actor, ChoiceOption::Action(ActionKind::Recruit), ctx)
    });
    assert_eq!(result, Err(GameError::IllegalAction(ActionKind::Recruit)));
}

#[test]
fn test_prompt_expires_at_dawn() {
    let mut table = Table::started(5);
    let actor = table.actor();

    let effects = table.day();

    assert!(effects.iter().any(|e| matches!(
        e,
        Effect::Edit { slot: Slot::NightPrompt, notice: Notice::PromptExpired, .. }
    )));
    assert!(announced(&effects, |n| matches!(n, Notice::QuietNight)));
    let result = table.with(|room, ctx| {
        room.choose(actor, ChoiceOption::Action(ActionKind::Murder), ctx)
    });
    assert_eq!(result, Err(GameError::PromptExpired));
}

#[test]
fn test_blackmail_decline_moves_penalty() {
    let mut table = Table::started(5);
    let traitor = table.traitors()[0];
    let target = table.faithful()[0];

    let effects = table.act(ActionKind::Blackmail, target);
    assert!(told(&effects, target).iter().any(|n| matches!(
        n,
        Notice::OfferReceived { action: ActionKind::Blackmail, penalty: 40 }
    )));

    let effects = table
        .with(|room, ctx| room.answer_offer(target, ActionKind::Blackmail, Decision::Decline, traitor, ctx))
        .unwrap();

    assert_eq!(table.points(target), 210);
    assert_eq!(table.points(traitor), 1040);
    assert!(told(&effects, target).iter().any(|n| matches!(
        n,
        Notice::OfferSettled { decision: Decision::Decline, penalty: 40, .. }
    )));
    assert!(announced(&effects, |n| matches!(n, Notice::NightBusinessDone)));
    assert_eq!(game_over(&effects), None);

    // Answering twice is refused.
    let again = table.with(|room, ctx| {
        room.answer_offer(target, ActionKind::Blackmail, Decision::Accept, traitor, ctx)
    });
    assert_eq!(again, Err(GameError::ActionAlreadyTaken));
}

#[test]
fn test_blackmail_decline_bankrupting_faithful_traitors_win() {
    let mut table = Table::started(5);
    let traitor = table.traitors()[0];
    let target = table.faithful()[0];
    table.act(ActionKind::Blackmail, target);
    for id in table.faithful() {
        table.room.players.get_mut(id).unwrap().points = 0;
    }
    table.room.players.get_mut(target).unwrap().points = 30;

    let effects = table
        .with(|room, ctx| room.answer_offer(target, ActionKind::Blackmail, Decision::Decline, traitor, ctx))
        .unwrap();

    // Penalty is capped at the balance.
    assert_eq!(table.points(traitor), 1030);
    assert_eq!(game_over(&effects), Some((Role::Traitor, WinReason::Bankruptcy)));
    assert_eq!(effects.last(), Some(&Effect::Close));
}

#[test]
fn test_recruit_accept_converts_target() {
    let mut table = Table::started(6);
    assert_eq!(table.traitors().len(), 2);
    let proposer = table.actor();
    let target = table.faithful()[0];

    table.act(ActionKind::Recruit, target);
    let effects = table
        .with(|room, ctx| room.answer_offer(target, ActionKind::Recruit, Decision::Accept, proposer, ctx))
        .unwrap();

    let player = table.room.players.get(target).unwrap();
    assert_eq!(player.role, Some(Role::Traitor));
    assert!(player.converted);
    assert_eq!(table.traitors().len(), 3);
    assert!(told(&effects, proposer).iter().any(|n| matches!(
        n,
        Notice::OfferAnswered { decision: Decision::Accept, .. }
    )));
}

#[test]
fn test_offer_from_wrong_proposer_prompt_expired() {
    let mut table = Table::started(5);
    let traitor = table.traitors()[0];
    let target = table.faithful()[0];
    let other = table.faithful()[1];
    table.act(ActionKind::Blackmail, target);

    let result = table.with(|room, ctx| {
        room.answer_offer(other, ActionKind::Blackmail, Decision::Accept, traitor, ctx)
    });
    assert_eq!(result, Err(GameError::PromptExpired));
}

#[test]
fn test_recruit_decline_changes_nothing_but_notifies_proposer() {
    let mut table = Table::started(6);
    let proposer = table.actor();
    let target = table.faithful()[0];
    table.act(ActionKind::Recruit, target);
    let before = table.room.players.clone();

    let effects = table
        .with(|room, ctx| room.answer_offer(target, ActionKind::Recruit, Decision::Decline, proposer, ctx))
        .unwrap();

    assert_eq!(table.room.players, before);
    assert_eq!(table.room.players.get(target).unwrap().role, Some(Role::Faithful));
    assert!(told(&effects, proposer).iter().any(|n| matches!(
        n,
        Notice::OfferAnswered { action: ActionKind::Recruit, decision: Decision::Decline, .. }
    )));
    assert!(told(&effects, target).iter().any(|n| matches!(
        n,
        Notice::OfferSettled { decision: Decision::Decline, penalty: 0, .. }
    )));
    assert_eq!(game_over(&effects), None);
}

#[test]
fn test_blackmail_accept_converts_last_traitors_target() {
    let mut table = Table::started(5);
    let traitor = table.traitors()[0];
    let target = table.faithful()[0];
    table.act(ActionKind::Blackmail, target);

    let effects = table
        .with(|room, ctx| room.answer_offer(target, ActionKind::Blackmail, Decision::Accept, traitor, ctx))
        .unwrap();

    let player = table.room.players.get(target).unwrap();
    assert_eq!(player.role, Some(Role::Traitor));
    assert!(player.converted);
    // No penalty on acceptance.
    assert_eq!(table.points(target), 250);
    assert_eq!(table.points(traitor), 1000);
    assert_eq!(table.traitors().len(), 2);
    assert!(told(&effects, traitor).iter().any(|n| matches!(
        n,
        Notice::OfferAnswered { action: ActionKind::Blackmail, decision: Decision::Accept, .. }
    )));
    assert_eq!(game_over(&effects), None);
}

#[test]
fn test_target_after_recruit_became_illegal_reopens_menu() {
    let mut table = Table::started(6);
    let actor = table.actor();
    let other = table.traitors().into_iter().find(|&t| t != actor).unwrap();
    let target = table.faithful()[0];
    table
        .with(|room, ctx| room.choose(actor, ChoiceOption::Action(ActionKind::Recruit), ctx))
        .unwrap();
    table
        .with(|room, ctx| room.remove_player(MODERATOR, other, ctx))
        .unwrap();

    let effects = table
        .with(|room, ctx| room.choose(actor, ChoiceOption::Target(ActionKind::Recruit, target), ctx))
        .unwrap();

    assert!(effects.iter().any(|e| matches!(
        e,
        Effect::Edit {
            slot: Slot::NightPrompt,
            notice: Notice::NightPrompt { actions, last_traitor: true },
            ..
        } if *actions == vec![ActionKind::Murder, ActionKind::Blackmail]
    )));
    assert_eq!(table.room.night_prompt.as_ref().unwrap().stage, PromptStage::Menu);
    assert!(table.room.offers.is_empty());

    // The fresh menu is usable.
    table.act(ActionKind::Murder, target);
    assert_eq!(table.room.players.get(target).unwrap().status, Status::Banished);
}

#[test]
fn test_murdering_last_faithful_traitors_win() {
    let mut table = Table::started(3);
    let traitor = table.traitors()[0];
    let [first, second] = table.faithful()[..] else {
        panic!("expected two faithful");
    };

    table.act(ActionKind::Murder, first);
    table.day();
    table.vote(traitor, second).unwrap();
    table.vote(second, traitor).unwrap();
    let night_at = table.room.schedule.night_at.unwrap();

    table.now = night_at;
    table
        .with(|room, ctx| room.timer_fired(TimerKind::NightStart, night_at, ctx))
        .unwrap();
    assert_eq!(table.room.phase, Phase::Night);

    let effects = table.act(ActionKind::Murder, second);
    assert_eq!(game_over(&effects), Some((Role::Traitor, WinReason::Elimination)));
}

// =========================================================================
// Voting
// =========================================================================

#[test]
fn test_two_two_tie_hung_vote_schedules_night() {
    let mut table = Table::started(5);
    table.act(ActionKind::Murder, table.faithful()[0]);
    table.day();

    let [a, b, c, d] = table.room.players.active().map(|p| p.id).collect::<Vec<_>>()[..] else {
        panic!("expected four active players");
    };
    table.vote(a, c).unwrap();
    table.vote(b, c).unwrap();
    table.vote(c, a).unwrap();
    let effects = table.vote(d, a).unwrap();

    assert!(announced(&effects, |n| matches!(n, Notice::HungVote)));
    assert_eq!(table.room.poll, Poll::Closed);
    let night_at = table.now + 12 * HOUR;
    assert!(effects.contains(&Effect::Arm {
        kind: TimerKind::NightStart,
        at: night_at
    }));
    assert_eq!(table.room.schedule.night_at, Some(night_at));
    assert!(table.room.players.active().all(|p| p.status == Status::Active));
}

#[test]
fn test_poll_closes_exactly_at_active_count() {
    let mut table = Table::started(5);
    table.act(ActionKind::Murder, table.faithful()[0]);
    table.day();
    let active: Vec<PlayerId> = table.room.players.active().map(|p| p.id).collect();
    assert_eq!(active.len(), 4);

    for (i, &voter) in active.iter().enumerate().take(3) {
        let target = active[(i + 1) % active.len()];
        table.vote(voter, target).unwrap();
        assert!(table.room.poll.is_open());
    }
    table.vote(active[3], active[0]).unwrap();
    assert_eq!(table.room.poll, Poll::Closed);
}

#[test]
fn test_banished_player_cannot_vote_or_be_voted_for() {
    let mut table = Table::started(5);
    let victim = table.faithful()[0];
    table.act(ActionKind::Murder, victim);
    table.day();
    let voter = table.faithful()[0];

    assert_eq!(table.vote(victim, voter), Err(GameError::NotActive(victim)));
    assert_eq!(table.vote(voter, victim), Err(GameError::NotActive(victim)));
}

#[test]
fn test_vote_validation_errors() {
    let mut table = Table::started(5);
    let [a, b] = table.faithful()[..2] else {
        panic!("expected faithful players");
    };
    assert_eq!(table.vote(a, b), Err(GameError::NoOpenPoll));

    table.day();
    assert_eq!(table.vote(a, a), Err(GameError::SelfTarget));
    assert_eq!(table.vote(a, PlayerId(99)), Err(GameError::NoSuchPlayer(PlayerId(99))));
    table.vote(a, b).unwrap();
    assert_eq!(table.vote(a, b), Err(GameError::AlreadyVoted(a)));
}

#[test]
fn test_banishment_conserves_points_modulo_remainder() {
    let mut table = Table::started(9);
    table.day();
    let faithful = table.faithful();
    let target = faithful[0];
    let before = table.total_points();
    let amount = table.points(target);

    for id in table.room.players.ids() {
        let choice = if id == target { faithful[1] } else { target };
        table.vote(id, choice).unwrap();
    }

    let after = table.total_points();
    let lost = amount % 3;
    assert_eq!(before - after, lost);
    assert_eq!(table.points(target), 0);
    for id in table.traitors() {
        assert_eq!(table.points(id), 333 + amount / 3);
    }
}

#[test]
fn test_banishing_last_traitor_faithful_win() {
    let mut table = Table::started(5);
    table.day();
    let traitor = table.traitors()[0];
    let faithful = table.faithful();

    let mut effects = Vec::new();
    for &id in &faithful {
        effects = table.vote(id, traitor).unwrap();
    }
    if table.room.poll.is_open() {
        effects = table.vote(traitor, faithful[0]).unwrap();
    }

    assert_eq!(game_over(&effects), Some((Role::Faithful, WinReason::Elimination)));
    assert_eq!(effects.last(), Some(&Effect::Close));
}

// =========================================================================
// Scheduling
// =========================================================================

#[test]
fn test_timed_day_long_lead_splits_at_midpoint() {
    let mut table = Table::started(5);
    let start = table.now;
    let vote_at = start + 10 * HOUR;

    let effects = table
        .with(|room, ctx| room.trigger_day_timed(MODERATOR, vote_at, ctx))
        .unwrap();
    let transition_at = start + 5 * HOUR;
    assert!(effects.contains(&Effect::Arm { kind: TimerKind::Transition, at: transition_at }));
    assert!(effects.contains(&Effect::Arm { kind: TimerKind::Vote, at: vote_at }));

    table.now = transition_at;
    let effects = table
        .with(|room, ctx| room.timer_fired(TimerKind::Transition, transition_at, ctx))
        .unwrap();
    assert_eq!(table.room.phase, Phase::Day);
    assert_eq!(table.room.poll, Poll::Idle);
    assert!(announced(&effects, |n| matches!(n, Notice::DiscussionOpened)));

    table.now = vote_at;
    table
        .with(|room, ctx| room.timer_fired(TimerKind::Vote, vote_at, ctx))
        .unwrap();
    assert!(table.room.poll.is_open());
    assert_eq!(table.room.schedule.armed(), vec![]);
}

#[test]
fn test_timed_day_short_lead_single_vote_timer() {
    let mut table = Table::started(5);
    let vote_at = table.now + HOUR;

    table
        .with(|room, ctx| room.trigger_day_timed(MODERATOR, vote_at, ctx))
        .unwrap();
    assert_eq!(table.room.schedule.armed(), vec![(TimerKind::Vote, vote_at)]);

    table.now = vote_at;
    table
        .with(|room, ctx| room.timer_fired(TimerKind::Vote, vote_at, ctx))
        .unwrap();
    assert_eq!(table.room.phase, Phase::Day);
    assert!(table.room.poll.is_open());
}

#[test]
fn test_timed_day_in_past_rejected() {
    let mut table = Table::started(5);
    let past = Timestamp(table.now.as_millis() - 1);
    let result = table.with(|room, ctx| room.trigger_day_timed(MODERATOR, past, ctx));
    assert_eq!(result, Err(GameError::ScheduleInPast(past)));
}

#[test]
fn test_stale_timer_fire_ignored() {
    let mut table = Table::started(5);
    let vote_at = table.now + HOUR;
    table
        .with(|room, ctx| room.trigger_day_timed(MODERATOR, vote_at, ctx))
        .unwrap();
    let before = table.room.clone();

    let effects = table
        .with(|room, ctx| room.timer_fired(TimerKind::Vote, vote_at + HOUR, ctx))
        .unwrap();

    assert!(effects.is_empty());
    assert_eq!(table.room, before);
}

#[test]
fn test_immediate_day_cancels_pending_timers() {
    let mut table = Table::started(5);
    let vote_at = table.now + 10 * HOUR;
    table
        .with(|room, ctx| room.trigger_day_timed(MODERATOR, vote_at, ctx))
        .unwrap();

    let effects = table.day();

    assert!(effects.contains(&Effect::Cancel { kind: TimerKind::Vote }));
    assert!(effects.contains(&Effect::Cancel { kind: TimerKind::Transition }));
    assert!(announced(&effects, |n| matches!(n, Notice::ScheduleOverridden)));
    assert!(table.room.schedule.armed().is_empty());
    assert!(table.room.poll.is_open());
}

#[test]
fn test_start_night_before_vote_resolves_invalid_phase() {
    let mut table = Table::started(5);
    table.day();
    let result = table.with(|room, ctx| room.start_night(MODERATOR, ctx));
    assert!(matches!(result, Err(GameError::InvalidPhase { phase: Phase::Day, .. })));
}

#[test]
fn test_start_night_after_hung_vote_prompts_traitor() {
    let mut table = Table::started(3);
    table.day();
    let [a, b, c] = table.room.players.ids()[..] else {
        panic!("expected three players");
    };
    table.vote(a, b).unwrap();
    table.vote(b, c).unwrap();
    table.vote(c, a).unwrap();
    assert_eq!(table.room.poll, Poll::Closed);

    let effects = table.with(|room, ctx| room.start_night(MODERATOR, ctx)).unwrap();

    assert_eq!(table.room.phase, Phase::Night);
    assert!(effects.contains(&Effect::Cancel { kind: TimerKind::NightStart }));
    let prompt = table.room.night_prompt.as_ref().unwrap();
    assert_eq!(prompt.stage, PromptStage::Menu);
    assert_eq!(table.room.day, 1);
}

#[test]
fn test_start_night_by_player_not_moderator_keeps_schedule() {
    let mut table = Table::started(3);
    table.day();
    let [a, b, c] = table.room.players.ids()[..] else {
        panic!("expected three players");
    };
    table.vote(a, b).unwrap();
    table.vote(b, c).unwrap();
    table.vote(c, a).unwrap();
    let night_at = table.room.schedule.get(TimerKind::NightStart);
    assert!(night_at.is_some());

    let result = table.with(|room, ctx| room.start_night(PlayerId(3), ctx));

    assert_eq!(result, Err(GameError::NotModerator(PlayerId(3))));
    assert_eq!(table.room.phase, Phase::Day);
    assert_eq!(table.room.poll, Poll::Closed);
    assert_eq!(table.room.schedule.get(TimerKind::NightStart), night_at);
}

// =========================================================================
// Moderation
// =========================================================================

#[test]
fn test_remove_player_withdraws_votes_and_closes_poll() {
    let mut table = Table::started(6);
    table.day();
    let traitors = table.traitors();
    let faithful = table.faithful();
    let leaving = faithful[3];

    // Everyone but `leaving` votes; two of those votes are for `leaving`.
    table.vote(faithful[0], leaving).unwrap();
    table.vote(faithful[1], leaving).unwrap();
    table.vote(faithful[2], traitors[0]).unwrap();
    table.vote(traitors[0], faithful[2]).unwrap();
    table.vote(traitors[1], faithful[2]).unwrap();
    assert!(table.room.poll.is_open());

    let effects = table
        .with(|room, ctx| room.remove_player(MODERATOR, leaving, ctx))
        .unwrap();

    // Five active players, five votes, but two were for `leaving` and are
    // withdrawn, so the poll stays open.
    assert!(announced(&effects, |n| matches!(n, Notice::PlayerRemoved { role: Role::Faithful, .. })));
    assert_eq!(table.room.votes.len(), 3);
    assert!(table.room.poll.is_open());

    table.vote(faithful[0], faithful[2]).unwrap();
    let effects = table.vote(faithful[1], traitors[0]).unwrap();
    assert_eq!(table.room.poll, Poll::Closed);
    assert!(announced(&effects, |n| matches!(n, Notice::Banished { .. })));
}

#[test]
fn test_remove_non_voter_closes_complete_poll() {
    let mut table = Table::started(5);
    table.day();
    let traitor = table.traitors()[0];
    let faithful = table.faithful();

    table.vote(faithful[0], faithful[1]).unwrap();
    table.vote(faithful[1], faithful[0]).unwrap();
    table.vote(faithful[2], faithful[0]).unwrap();
    table.vote(traitor, faithful[1]).unwrap();

    let effects = table
        .with(|room, ctx| room.remove_player(MODERATOR, faithful[3], ctx))
        .unwrap();

    assert_eq!(table.room.poll, Poll::Closed);
    assert!(announced(&effects, |n| matches!(n, Notice::HungVote)));
}

#[test]
fn test_remove_last_traitor_faithful_win() {
    let mut table = Table::started(5);
    let traitor = table.traitors()[0];

    let effects = table
        .with(|room, ctx| room.remove_player(MODERATOR, traitor, ctx))
        .unwrap();

    assert!(game_over(&effects).is_some_and(|(winner, _)| winner == Role::Faithful));
    assert_eq!(effects.last(), Some(&Effect::Close));
}

#[test]
fn test_remove_player_requires_moderator() {
    let mut table = Table::started(5);
    let target = table.faithful()[0];
    let result = table.with(|room, ctx| room.remove_player(PlayerId(5), target, ctx));
    assert_eq!(result, Err(GameError::NotModerator(PlayerId(5))));
}

#[test]
fn test_end_game_tie_goes_to_faithful() {
    let mut table = Table::started(5);
    let effects = table.room.end_game(MODERATOR).unwrap();
    assert_eq!(game_over(&effects), Some((Role::Faithful, WinReason::ModeratorEnded)));
    assert!(effects.contains(&Effect::Close));
}

#[test]
fn test_record_handle_tracks_poll() {
    let mut table = Table::started(5);
    table.day();
    let handle = turncoat_protocol::MessageHandle {
        audience: Audience::Room(ROOM),
        message_id: 7,
    };
    table.room.record_handle(Slot::Poll, handle);
    assert_eq!(table.room.poll, Poll::Open { handle: Some(handle) });
    assert_eq!(table.room.validate(), Ok(()));
}
