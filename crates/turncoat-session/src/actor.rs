//! Room actor: an isolated Tokio task that owns one game.
//!
//! Every operation on a room, whether a player's request or a timer
//! firing, arrives as a message and runs to completion before the next
//! one starts. Operations run on a working copy of the room that replaces
//! the live one only on success, so a rejected request leaves nothing
//! half-applied. Rooms share no locks with each other.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{RwLock, mpsc, oneshot};
use turncoat_game::{Ctx, Effect, GameError, Poll, Room, Slot, TimerKind};
use turncoat_gateway::Gateway;
use turncoat_protocol::{
    Audience, ChoiceOption, MessageHandle, Notice, PlayerId, RoomId, Timestamp,
};
use turncoat_timer::TimerSet;

use crate::StoreConfig;
use crate::StoreError;
use crate::courier::{Delivery, HandleIssued, spawn_courier};
use crate::persister::PersisterHandle;

/// Live rooms, keyed by id. Locked only to look up or swap a handle.
pub(crate) type Registry = Arc<RwLock<HashMap<RoomId, RoomHandle>>>;

/// Distinguishes an actor from a later one spawned for the same room id.
static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// A state-machine operation requested from outside the room.
#[derive(Debug, Clone)]
pub(crate) enum Op {
    Join { player: PlayerId, name: String },
    Begin { requester: PlayerId },
    TriggerDayImmediate { requester: PlayerId },
    TriggerDayTimed { requester: PlayerId, fire_at: Timestamp },
    StartNight { requester: PlayerId },
    RemovePlayer { requester: PlayerId, target: PlayerId },
    EndGame { requester: PlayerId },
    Choose { actor: PlayerId, option: ChoiceOption },
}

pub(crate) enum RoomCommand {
    Apply {
        op: Op,
        reply: oneshot::Sender<Result<(), GameError>>,
    },
    Snapshot {
        reply: oneshot::Sender<Room>,
    },
    /// Stop the actor without closing the game; its state stays persisted.
    /// The reply is sent once the actor has stopped taking work.
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Handle to a running room actor. Cheap to clone.
#[derive(Clone)]
pub(crate) struct RoomHandle {
    room_id: RoomId,
    generation: u64,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub(crate) async fn apply(&self, op: Op) -> Result<(), StoreError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Apply { op, reply: reply_tx })
            .await
            .map_err(|_| StoreError::Unavailable(self.room_id))?;
        reply_rx
            .await
            .map_err(|_| StoreError::Unavailable(self.room_id))?
            .map_err(StoreError::from)
    }

    pub(crate) async fn snapshot(&self) -> Result<Room, StoreError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Snapshot { reply: reply_tx })
            .await
            .map_err(|_| StoreError::Unavailable(self.room_id))?;
        reply_rx
            .await
            .map_err(|_| StoreError::Unavailable(self.room_id))
    }

    pub(crate) async fn shutdown(&self) -> Result<(), StoreError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Shutdown { reply: reply_tx })
            .await
            .map_err(|_| StoreError::Unavailable(self.room_id))?;
        reply_rx
            .await
            .map_err(|_| StoreError::Unavailable(self.room_id))
    }
}

/// Sequence numbers of tracked sends.
///
/// A handle comes back from the courier some time after its send was
/// queued. By then the slot may have been reused (tomorrow's poll), so
/// only the handle of the latest send into a slot is accepted.
#[derive(Debug, Default)]
struct SendLog {
    sends: u64,
    latest: HashMap<Slot, u64>,
}

impl SendLog {
    /// Numbers a new tracked send into `slot`.
    fn issue(&mut self, slot: Slot) -> u64 {
        self.sends += 1;
        self.latest.insert(slot, self.sends);
        self.sends
    }

    fn is_current(&self, slot: Slot, seq: u64) -> bool {
        self.latest.get(&slot) == Some(&seq)
    }
}

/// What every room actor shares with the store.
pub(crate) struct Shared<G> {
    pub(crate) config: StoreConfig,
    pub(crate) gateway: Arc<G>,
    pub(crate) persister: PersisterHandle,
    pub(crate) registry: Registry,
}

struct RoomActor {
    room: Room,
    generation: u64,
    config: StoreConfig,
    timers: TimerSet<TimerKind>,
    rng: StdRng,
    receiver: mpsc::Receiver<RoomCommand>,
    issued: mpsc::UnboundedReceiver<HandleIssued>,
    courier: mpsc::Sender<Delivery>,
    sends: SendLog,
    persister: PersisterHandle,
    registry: Registry,
    closed: bool,
}

impl RoomActor {
    async fn run(mut self) {
        tracing::info!(room_id = %self.room.id, phase = %self.room.phase, "room actor started");

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => match cmd {
                    Some(RoomCommand::Apply { op, reply }) => {
                        let result = self.apply(op);
                        if self.closed {
                            // Deregister before replying, so the caller can
                            // start a new game here straight away.
                            self.deregister().await;
                        }
                        let _ = reply.send(result);
                    }
                    Some(RoomCommand::Snapshot { reply }) => {
                        let _ = reply.send(self.room.clone());
                    }
                    Some(RoomCommand::Shutdown { reply }) => {
                        let _ = reply.send(());
                        break;
                    }
                    None => break,
                },
                Some(issued) = self.issued.recv() => {
                    self.record_handle(issued);
                }
                fired = self.timers.wait_for_fire() => {
                    let (kind, at) = (fired.kind, fired.at);
                    if let Err(e) = self.execute(|room, ctx| room.timer_fired(kind, at, ctx)) {
                        tracing::warn!(room_id = %self.room.id, %kind, error = %e, "timer transition rejected");
                    }
                }
            }

            if self.closed {
                self.deregister().await;
                break;
            }
        }

        tracing::info!(room_id = %self.room.id, closed = self.closed, "room actor stopped");
    }

    fn apply(&mut self, op: Op) -> Result<(), GameError> {
        let result = match &op {
            Op::Join { player, name } => self.execute(|room, _| room.join(*player, name)),
            Op::Begin { requester } => self.execute(|room, ctx| room.begin(*requester, ctx)),
            Op::TriggerDayImmediate { requester } => {
                self.execute(|room, ctx| room.trigger_day_immediate(*requester, ctx))
            }
            Op::TriggerDayTimed { requester, fire_at } => {
                self.execute(|room, ctx| room.trigger_day_timed(*requester, *fire_at, ctx))
            }
            Op::StartNight { requester } => {
                self.execute(|room, ctx| room.start_night(*requester, ctx))
            }
            Op::RemovePlayer { requester, target } => {
                self.execute(|room, ctx| room.remove_player(*requester, *target, ctx))
            }
            Op::EndGame { requester } => self.execute(|room, _| room.end_game(*requester)),
            Op::Choose { actor, option } => self.execute(|room, ctx| room.choose(*actor, *option, ctx)),
        };

        if let Err(e) = &result {
            tracing::debug!(room_id = %self.room.id, ?op, error = %e, "operation rejected");
            if let Op::Choose { actor, .. } = op {
                // Button presses have no reply path; tell the player.
                self.dispatch(Delivery::Send {
                    to: Audience::Player(actor),
                    notice: Notice::Rejected {
                        reason: e.to_string(),
                    },
                    options: Vec::new(),
                    track: None,
                });
            }
        }
        result
    }

    /// Runs `op` on a working copy and commits it if it succeeds.
    fn execute<F>(&mut self, op: F) -> Result<(), GameError>
    where
        F: FnOnce(&mut Room, &mut Ctx<'_>) -> Result<Vec<Effect>, GameError>,
    {
        let now = Timestamp::now();
        let mut working = self.room.clone();
        let effects = {
            let mut ctx = Ctx::new(&self.config.game, now, &mut self.rng);
            op(&mut working, &mut ctx)?
        };
        self.room = working;
        self.carry_out(effects, now);
        Ok(())
    }

    /// Executes effects in order, then hands the committed room to the
    /// snapshot writer.
    fn carry_out(&mut self, effects: Vec<Effect>, now: Timestamp) {
        for effect in effects {
            match effect {
                Effect::Send {
                    to,
                    notice,
                    options,
                    track,
                } => {
                    let track = track.map(|slot| (slot, self.sends.issue(slot)));
                    self.dispatch(Delivery::Send {
                        to,
                        notice,
                        options,
                        track,
                    });
                }
                Effect::Edit {
                    slot,
                    notice,
                    options,
                } => self.dispatch(Delivery::Edit {
                    slot,
                    notice,
                    options,
                }),
                Effect::Arm { kind, at } => {
                    self.timers.arm(kind, at, now);
                }
                Effect::Cancel { kind } => {
                    self.timers.cancel(kind);
                }
                Effect::Close => self.closed = true,
            }
        }

        if self.closed {
            self.timers.clear();
            self.persister.remove(self.room.id);
        } else {
            self.persister.upsert(self.room.clone());
        }
    }

    fn dispatch(&self, delivery: Delivery) {
        match self.courier.try_send(delivery) {
            Ok(()) => {}
            Err(TrySendError::Full(delivery)) => {
                tracing::warn!(room_id = %self.room.id, ?delivery, "courier queue full, message dropped");
            }
            Err(TrySendError::Closed(_)) => {
                tracing::warn!(room_id = %self.room.id, "courier gone, message dropped");
            }
        }
    }

    fn record_handle(&mut self, issued: HandleIssued) {
        if self.closed {
            return;
        }
        let HandleIssued { slot, seq, handle } = issued;
        if !self.sends.is_current(slot, seq) {
            tracing::debug!(room_id = %self.room.id, ?slot, %handle, "stale message handle ignored");
            return;
        }
        self.room.record_handle(slot, handle);
        self.persister.upsert(self.room.clone());
    }

    async fn deregister(&self) {
        let mut rooms = self.registry.write().await;
        if rooms
            .get(&self.room.id)
            .is_some_and(|handle| handle.generation == self.generation)
        {
            rooms.remove(&self.room.id);
            tracing::info!(room_id = %self.room.id, "room closed");
        }
    }
}

/// Handles of the tracked messages a room already has.
fn tracked_slots(room: &Room) -> HashMap<Slot, MessageHandle> {
    let mut slots = HashMap::new();
    if let Poll::Open {
        handle: Some(handle),
    } = room.poll
    {
        slots.insert(Slot::Poll, handle);
    }
    if let Some(handle) = room.night_prompt.as_ref().and_then(|p| p.handle) {
        slots.insert(Slot::NightPrompt, handle);
    }
    slots
}

fn room_rng(seed: Option<u64>, room_id: RoomId) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed ^ room_id.0 as u64),
        None => StdRng::from_os_rng(),
    }
}

/// Spawns an actor for `room` and returns a handle to it.
///
/// `effects` are carried out first (the opening announcement of a new
/// room), then `timers` are armed (recovered from persisted state). The
/// caller registers the handle.
pub(crate) fn spawn_room<G: Gateway>(
    room: Room,
    effects: Vec<Effect>,
    timers: Vec<(TimerKind, Timestamp)>,
    shared: &Shared<G>,
) -> RoomHandle {
    let room_id = room.id;
    let (sender, receiver) = mpsc::channel(shared.config.mailbox_size);
    let (courier, issued) = spawn_courier(
        room_id,
        Arc::clone(&shared.gateway),
        tracked_slots(&room),
        shared.config.courier_queue,
    );
    let generation = NEXT_GENERATION.fetch_add(1, Ordering::Relaxed);

    let mut actor = RoomActor {
        rng: room_rng(shared.config.game.rng_seed, room_id),
        room,
        generation,
        config: shared.config.clone(),
        timers: TimerSet::new(shared.config.timers.clone()),
        receiver,
        issued,
        courier,
        sends: SendLog::default(),
        persister: shared.persister.clone(),
        registry: Arc::clone(&shared.registry),
        closed: false,
    };

    let now = Timestamp::now();
    if !effects.is_empty() {
        actor.carry_out(effects, now);
    }
    for (kind, at) in timers {
        actor.timers.arm(kind, at, now);
    }

    tokio::spawn(actor.run());

    RoomHandle {
        room_id,
        generation,
        sender,
    }
}
