//! The session store: the entry point for every room operation.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use turncoat_game::{GameError, Room};
use turncoat_gateway::Gateway;
use turncoat_protocol::{Choice, PlayerId, RoomId, Timestamp};
use turncoat_timer::recover;

use crate::actor::{Op, RoomHandle, Shared, spawn_room};
use crate::persistence::{Persistence, RoomTable};
use crate::persister::spawn_persister;
use crate::{StoreConfig, StoreError};

/// Owns every live room.
///
/// Each room is a separate actor; the store only keeps the table of
/// handles, and holds its lock just long enough to look one up. Two
/// players voting in the same room are served one after the other by
/// that room's actor, while other rooms carry on untouched.
///
/// ```rust,no_run
/// use turncoat_gateway::RecordingGateway;
/// use turncoat_protocol::{PlayerId, RoomId};
/// use turncoat_session::{MemoryPersistence, SessionStore, StoreConfig};
///
/// # async fn demo() -> Result<(), turncoat_session::StoreError> {
/// let store = SessionStore::open(
///     StoreConfig::default(),
///     RecordingGateway::new(),
///     MemoryPersistence::new(),
/// )
/// .await?;
///
/// store.start_game(RoomId(-100), PlayerId(1)).await?;
/// store.join(RoomId(-100), PlayerId(2), "Ada").await?;
/// # Ok(())
/// # }
/// ```
pub struct SessionStore<G> {
    shared: Shared<G>,
}

impl<G: Gateway> SessionStore<G> {
    /// Loads persisted rooms and starts an actor for each.
    ///
    /// Rooms that fail validation are dropped with an error log. Timers
    /// still in the future are re-armed; timers whose time passed while
    /// the process was down are dropped without firing, leaving the
    /// moderator to re-trigger the transition.
    ///
    /// # Errors
    /// Returns `StoreError::Persistence` if the table cannot be read at
    /// all. Starting empty would overwrite it on the first save.
    pub async fn open<P: Persistence>(
        config: StoreConfig,
        gateway: G,
        persistence: P,
    ) -> Result<Self, StoreError> {
        let config = config.validated();
        let loaded = persistence.load_all().await?;
        let now = Timestamp::now();

        let mut survivors = RoomTable::new();
        let mut recovered = Vec::new();
        let mut changed = false;
        for (room_id, mut room) in loaded {
            if let Err(e) = check_loaded(room_id, &room) {
                tracing::error!(%room_id, error = %e, "dropping corrupt room");
                changed = true;
                continue;
            }

            let recovery = recover(room.schedule.armed(), now);
            for (kind, at) in &recovery.expired {
                tracing::warn!(%room_id, %kind, %at, "timer expired while offline, dropped");
                room.schedule.set(*kind, None);
                changed = true;
            }
            survivors.insert(room_id, room.clone());
            recovered.push((room, recovery.pending));
        }

        let shared = Shared {
            persister: spawn_persister(persistence, survivors, changed),
            gateway: Arc::new(gateway),
            registry: Arc::new(RwLock::new(HashMap::new())),
            config,
        };

        {
            let mut rooms = shared.registry.write().await;
            for (room, timers) in recovered {
                let room_id = room.id;
                tracing::info!(%room_id, phase = %room.phase, timers = timers.len(), "room recovered");
                rooms.insert(room_id, spawn_room(room, Vec::new(), timers, &shared));
            }
        }

        Ok(Self { shared })
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Opens a lobby in `room_id`, moderated by `moderator`.
    ///
    /// # Errors
    /// `GameError::AlreadyInProgress` if the room already has a game.
    pub async fn start_game(&self, room_id: RoomId, moderator: PlayerId) -> Result<(), StoreError> {
        let mut rooms = self.shared.registry.write().await;
        if rooms.contains_key(&room_id) {
            return Err(GameError::AlreadyInProgress(room_id).into());
        }
        let (room, effects) = Room::open(room_id, moderator);
        let handle = spawn_room(room, effects, Vec::new(), &self.shared);
        rooms.insert(room_id, handle);
        Ok(())
    }

    pub async fn join(&self, room_id: RoomId, player: PlayerId, name: &str) -> Result<(), StoreError> {
        self.apply(
            room_id,
            Op::Join {
                player,
                name: name.to_string(),
            },
        )
        .await
    }

    pub async fn begin(&self, room_id: RoomId, requester: PlayerId) -> Result<(), StoreError> {
        self.apply(room_id, Op::Begin { requester }).await
    }

    /// Moves to day now, or opens the vote now if the day's discussion is
    /// already under way. Cancels any scheduled day.
    pub async fn trigger_day_immediate(
        &self,
        room_id: RoomId,
        requester: PlayerId,
    ) -> Result<(), StoreError> {
        self.apply(room_id, Op::TriggerDayImmediate { requester }).await
    }

    /// Schedules the day vote for `fire_at`. A long lead splits the night
    /// with a discussion window starting halfway.
    pub async fn trigger_day_timed(
        &self,
        room_id: RoomId,
        requester: PlayerId,
        fire_at: Timestamp,
    ) -> Result<(), StoreError> {
        self.apply(room_id, Op::TriggerDayTimed { requester, fire_at })
            .await
    }

    /// Brings nightfall forward once the day's vote has resolved.
    pub async fn start_night(&self, room_id: RoomId, requester: PlayerId) -> Result<(), StoreError> {
        self.apply(room_id, Op::StartNight { requester }).await
    }

    pub async fn remove_player(
        &self,
        room_id: RoomId,
        requester: PlayerId,
        target: PlayerId,
    ) -> Result<(), StoreError> {
        self.apply(room_id, Op::RemovePlayer { requester, target })
            .await
    }

    pub async fn end_game(&self, room_id: RoomId, requester: PlayerId) -> Result<(), StoreError> {
        self.apply(room_id, Op::EndGame { requester }).await
    }

    /// Handles a pressed interactive option, given as the token the gateway
    /// was handed. The room is read from the token.
    ///
    /// A rejection is also sent privately to `actor`.
    pub async fn choose(&self, actor: PlayerId, token: &str) -> Result<(), StoreError> {
        let choice: Choice = token.parse()?;
        self.choose_option(actor, choice).await
    }

    pub async fn choose_option(&self, actor: PlayerId, choice: Choice) -> Result<(), StoreError> {
        self.apply(
            choice.room,
            Op::Choose {
                actor,
                option: choice.option,
            },
        )
        .await
    }

    // -----------------------------------------------------------------------
    // Inspection and lifecycle
    // -----------------------------------------------------------------------

    /// The current committed state of a room.
    pub async fn snapshot(&self, room_id: RoomId) -> Result<Room, StoreError> {
        self.handle(room_id).await?.snapshot().await
    }

    /// Ids of every live room, ascending.
    pub async fn rooms(&self) -> Vec<RoomId> {
        let mut ids: Vec<RoomId> = self.shared.registry.read().await.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Waits until every state change committed so far has been handed
    /// to persistence.
    pub async fn flush(&self) {
        self.shared.persister.flush().await;
    }

    /// Stops every room actor and flushes. Games are not ended; a store
    /// opened later on the same persistence picks them up again.
    pub async fn shutdown(&self) {
        let handles: Vec<RoomHandle> = {
            let mut rooms = self.shared.registry.write().await;
            rooms.drain().map(|(_, handle)| handle).collect()
        };
        for handle in handles {
            // An actor that is already gone has nothing left to stop.
            let _ = handle.shutdown().await;
        }
        self.flush().await;
        tracing::info!("session store shut down");
    }

    async fn handle(&self, room_id: RoomId) -> Result<RoomHandle, StoreError> {
        self.shared
            .registry
            .read()
            .await
            .get(&room_id)
            .cloned()
            .ok_or(StoreError::Game(GameError::NoSuchRoom(room_id)))
    }

    async fn apply(&self, room_id: RoomId, op: Op) -> Result<(), StoreError> {
        self.handle(room_id).await?.apply(op).await
    }
}

/// A loaded room must be internally consistent and filed under its own id.
fn check_loaded(room_id: RoomId, room: &Room) -> Result<(), GameError> {
    if room.id != room_id {
        return Err(GameError::CorruptRoom {
            room: room_id,
            reason: format!("stored under {room_id} but claims to be {}", room.id),
        });
    }
    room.validate()
}
