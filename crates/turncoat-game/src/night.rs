//! Night actions: murder, recruit, blackmail.
//!
//! Each night one active traitor, picked at random, gets a private menu.
//! With two or more traitors active it offers murder or recruit; the last
//! traitor gets murder or blackmail instead. Recruit and blackmail don't
//! resolve until their target answers the offer, which may be after dawn.

use turncoat_protocol::{
    ActionKind, Audience, Choice, ChoiceOption, Decision, Notice, PlayerId, Role,
};

use crate::effect::Effects;
use crate::machine::Ctx;
use crate::{
    Effect, GameError, NightPrompt, PendingOffer, Phase, Poll, PromptStage, Room, Slot, Status,
    draft, economy,
};

/// Actions on the menu when `traitors` are active.
pub fn menu_for(traitors: usize) -> Vec<ActionKind> {
    if traitors >= 2 {
        vec![ActionKind::Murder, ActionKind::Recruit]
    } else {
        vec![ActionKind::Murder, ActionKind::Blackmail]
    }
}

impl Room {
    /// Nightfall: pick tonight's actor and send them the menu.
    pub(crate) fn open_night(&mut self, ctx: &mut Ctx<'_>, fx: &mut Effects) {
        self.phase = Phase::Night;
        self.poll = Poll::Idle;
        self.votes.clear();
        self.night_prompt = None;
        self.offers.retain(|o| !o.settled);

        fx.announce(self.id, Notice::NightFalls);
        let traitors = self.players.active_ids_as(Role::Traitor);
        let Some(actor) = draft::pick_one(ctx.rng, &traitors) else {
            fx.announce(self.id, Notice::PeacefulNight);
            tracing::info!(room_id = %self.id, "night falls with no traitors");
            return;
        };

        self.night_prompt = Some(NightPrompt {
            actor,
            stage: PromptStage::Menu,
            handle: None,
        });
        let (notice, options) = self.menu(traitors.len());
        fx.send(Audience::Player(actor), notice, options, Some(Slot::NightPrompt));
        tracing::info!(room_id = %self.id, %actor, "night falls");
    }

    /// The action menu for `traitors` active traitors.
    fn menu(&self, traitors: usize) -> (Notice, Vec<Choice>) {
        let actions = menu_for(traitors);
        let options = actions
            .iter()
            .map(|&action| Choice::new(self.id, ChoiceOption::Action(action)))
            .collect();
        let notice = Notice::NightPrompt {
            actions,
            last_traitor: traitors == 1,
        };
        (notice, options)
    }

    /// Puts the prompt back on the menu, rebuilt for the traitors active
    /// now.
    fn reopen_menu(&mut self, fx: &mut Effects) {
        self.set_prompt_stage(PromptStage::Menu);
        let (notice, options) = self.menu(self.players.count_active_as(Role::Traitor));
        fx.edit(Slot::NightPrompt, notice, options);
    }

    /// The prompt must be live and addressed to `actor`.
    fn live_prompt(&self, actor: PlayerId) -> Result<&NightPrompt, GameError> {
        if self.phase != Phase::Night {
            return Err(GameError::PromptExpired);
        }
        match &self.night_prompt {
            Some(prompt) if prompt.actor == actor => Ok(prompt),
            _ => Err(GameError::PromptExpired),
        }
    }

    fn check_legal(&self, action: ActionKind) -> Result<(), GameError> {
        if menu_for(self.players.count_active_as(Role::Traitor)).contains(&action) {
            Ok(())
        } else {
            Err(GameError::IllegalAction(action))
        }
    }

    fn set_prompt_stage(&mut self, stage: PromptStage) {
        if let Some(prompt) = self.night_prompt.as_mut() {
            prompt.stage = stage;
        }
    }

    /// The prompted traitor picked an action; show them the targets.
    pub fn choose_action(
        &mut self,
        actor: PlayerId,
        action: ActionKind,
    ) -> Result<Vec<Effect>, GameError> {
        let prompt = self.live_prompt(actor)?;
        if prompt.stage != PromptStage::Menu {
            return Err(GameError::ActionAlreadyTaken);
        }
        self.players.require_active(actor)?;
        self.check_legal(action)?;

        let mut fx = Effects::default();
        let targets = self.players.targets_as(Role::Faithful);
        if targets.is_empty() {
            fx.edit(Slot::NightPrompt, Notice::NoTargets, Vec::new());
            self.set_prompt_stage(PromptStage::Resolved);
            return Ok(fx.into_vec());
        }

        let options = targets
            .iter()
            .map(|t| Choice::new(self.id, ChoiceOption::Target(action, t.player)))
            .collect();
        fx.edit(Slot::NightPrompt, Notice::TargetMenu { action, targets }, options);
        self.set_prompt_stage(PromptStage::Targeting(action));
        Ok(fx.into_vec())
    }

    /// The prompted traitor picked a target. Murder resolves now; recruit
    /// and blackmail send an offer to the target.
    ///
    /// If the chosen action stopped being legal since it was picked (a
    /// traitor left the game), the prompt goes back to a fresh menu.
    pub fn choose_target(
        &mut self,
        actor: PlayerId,
        action: ActionKind,
        target: PlayerId,
        ctx: &mut Ctx<'_>,
    ) -> Result<Vec<Effect>, GameError> {
        let prompt = self.live_prompt(actor)?;
        match prompt.stage {
            PromptStage::Targeting(chosen) if chosen == action => {}
            PromptStage::Resolved => return Err(GameError::ActionAlreadyTaken),
            _ => return Err(GameError::IllegalAction(action)),
        }
        self.players.require_active(actor)?;
        let mut fx = Effects::default();
        if self.check_legal(action).is_err() {
            tracing::debug!(room_id = %self.id, %actor, %action, "action no longer legal, menu reopened");
            self.reopen_menu(&mut fx);
            return Ok(fx.into_vec());
        }
        if actor == target {
            return Err(GameError::SelfTarget);
        }
        let victim = self.players.require_active(target)?;
        if victim.role != Some(Role::Faithful) {
            return Err(GameError::IllegalAction(action));
        }
        let name = victim.name.clone();

        self.set_prompt_stage(PromptStage::Resolved);
        fx.edit(
            Slot::NightPrompt,
            Notice::ActionConfirmed {
                action,
                target: name,
            },
            Vec::new(),
        );
        tracing::info!(room_id = %self.id, %actor, %action, %target, "night action chosen");

        match action {
            ActionKind::Murder => self.murder(target, &mut fx),
            ActionKind::Recruit | ActionKind::Blackmail => {
                self.propose(action, actor, target, ctx, &mut fx)
            }
        }
        Ok(fx.into_vec())
    }

    /// The victim's points go to the active traitors. The murder is only
    /// announced at dawn.
    fn murder(&mut self, victim: PlayerId, fx: &mut Effects) {
        if let Some(player) = self.players.get_mut(victim) {
            player.status = Status::Banished;
        }
        economy::forfeit(&mut self.players, victim);
        self.pending_murder = Some(victim);
        self.settle(fx);
    }

    fn propose(
        &mut self,
        action: ActionKind,
        proposer: PlayerId,
        target: PlayerId,
        ctx: &Ctx<'_>,
        fx: &mut Effects,
    ) {
        self.offers.retain(|o| o.settled || o.target != target);
        self.offers.push(PendingOffer {
            action,
            target,
            proposer,
            settled: false,
        });

        let penalty = match action {
            ActionKind::Blackmail => ctx.config.blackmail_penalty,
            _ => 0,
        };
        let options = [Decision::Accept, Decision::Decline]
            .into_iter()
            .map(|decision| {
                Choice::new(
                    self.id,
                    ChoiceOption::Offer {
                        action,
                        decision,
                        proposer,
                    },
                )
            })
            .collect();
        fx.send(
            Audience::Player(target),
            Notice::OfferReceived { action, penalty },
            options,
            None,
        );
    }

    /// The target of a recruit or blackmail offer answered it.
    ///
    /// Accepting either offer converts the target. Declining blackmail
    /// costs the target the penalty (capped at their balance), paid to the
    /// proposer. Declining a recruit costs nothing.
    pub fn answer_offer(
        &mut self,
        actor: PlayerId,
        action: ActionKind,
        decision: Decision,
        proposer: PlayerId,
        ctx: &mut Ctx<'_>,
    ) -> Result<Vec<Effect>, GameError> {
        let index = self
            .offers
            .iter()
            .position(|o| o.target == actor && o.proposer == proposer && o.action == action)
            .ok_or(GameError::PromptExpired)?;
        if self.offers[index].settled {
            return Err(GameError::ActionAlreadyTaken);
        }
        let target_ok = self
            .players
            .get(actor)
            .is_some_and(|p| p.is_active_as(Role::Faithful));
        let proposer_ok = self
            .players
            .get(proposer)
            .is_some_and(|p| p.is_active_as(Role::Traitor));
        if !target_ok || !proposer_ok {
            return Err(GameError::PromptExpired);
        }

        let mut penalty = 0;
        match (action, decision) {
            (ActionKind::Murder, _) => return Err(GameError::IllegalAction(action)),
            (_, Decision::Accept) => {
                let player = self.players.require_mut(actor)?;
                player.role = Some(Role::Traitor);
                player.converted = true;
            }
            (ActionKind::Blackmail, Decision::Decline) => {
                penalty = economy::transfer(
                    &mut self.players,
                    actor,
                    proposer,
                    ctx.config.blackmail_penalty,
                );
            }
            (ActionKind::Recruit, Decision::Decline) => {}
        }
        self.offers[index].settled = true;
        tracing::info!(
            room_id = %self.id,
            target = %actor,
            %proposer,
            %action,
            decision = decision.as_str(),
            penalty,
            "offer answered"
        );

        let mut fx = Effects::default();
        fx.tell(
            actor,
            Notice::OfferSettled {
                action,
                decision,
                penalty,
            },
        );
        fx.tell(
            proposer,
            Notice::OfferAnswered {
                action,
                decision,
                target: self.players.name_of(actor),
            },
        );
        fx.announce(self.id, Notice::NightBusinessDone);
        self.settle(&mut fx);
        Ok(fx.into_vec())
    }
}
