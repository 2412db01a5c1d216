//! The `Turncoat` builder and command surface.

use std::path::PathBuf;

use turncoat_game::{GameConfig, Room};
use turncoat_gateway::Gateway;
use turncoat_protocol::{PlayerId, RoomId, Timestamp};
use turncoat_session::{
    FileStoreConfig, JsonFileStore, Persistence, SessionStore, StoreConfig,
};

use crate::TurncoatError;

/// One verb per state-machine entry point.
///
/// The host bot parses its chat commands into these and hands them to
/// [`Turncoat::execute`]. Button presses go through
/// [`Turncoat::choose`] instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Open a lobby; the sender moderates.
    StartGame,
    Join { name: String },
    Begin,
    /// Move to the vote now.
    DayNow,
    /// Schedule the vote for a wall-clock time.
    DayAt(Timestamp),
    /// Bring nightfall forward after the vote. Moderator only.
    StartNight,
    Remove(PlayerId),
    EndGame,
}

/// Builder for a [`Turncoat`] engine.
///
/// # Example
///
/// ```rust,no_run
/// use turncoat::prelude::*;
///
/// # async fn demo() -> Result<(), TurncoatError> {
/// let engine = TurncoatBuilder::new()
///     .state_path("/var/lib/turncoat/state.json")
///     .build(RecordingGateway::new())
///     .await?;
/// engine.execute(RoomId(-100), PlayerId(1), Command::StartGame).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct TurncoatBuilder {
    store: StoreConfig,
    file: FileStoreConfig,
}

impl TurncoatBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the game rules.
    pub fn game_config(mut self, config: GameConfig) -> Self {
        self.store.game = config;
        self
    }

    /// Sets the session store configuration, including its game rules.
    pub fn store_config(mut self, config: StoreConfig) -> Self {
        self.store = config;
        self
    }

    /// Sets where the JSON state file lives.
    pub fn state_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file.path = path.into();
        self
    }

    /// Builds the engine on the JSON file store, recovering any games
    /// saved there.
    pub async fn build<G: Gateway>(self, gateway: G) -> Result<Turncoat<G>, TurncoatError> {
        let persistence = JsonFileStore::new(self.file.clone());
        self.build_with(gateway, persistence).await
    }

    /// Builds the engine on any persistence implementation.
    pub async fn build_with<G: Gateway, P: Persistence>(
        self,
        gateway: G,
        persistence: P,
    ) -> Result<Turncoat<G>, TurncoatError> {
        let store = SessionStore::open(self.store, gateway, persistence).await?;
        tracing::info!(rooms = store.rooms().await.len(), "turncoat engine ready");
        Ok(Turncoat { store })
    }
}

/// A running engine.
pub struct Turncoat<G> {
    store: SessionStore<G>,
}

impl<G: Gateway> Turncoat<G> {
    /// Runs a command from `sender` against `room`.
    pub async fn execute(
        &self,
        room: RoomId,
        sender: PlayerId,
        command: Command,
    ) -> Result<(), TurncoatError> {
        tracing::debug!(room_id = %room, %sender, ?command, "command");
        let store = &self.store;
        match command {
            Command::StartGame => store.start_game(room, sender).await?,
            Command::Join { name } => store.join(room, sender, &name).await?,
            Command::Begin => store.begin(room, sender).await?,
            Command::DayNow => store.trigger_day_immediate(room, sender).await?,
            Command::DayAt(at) => store.trigger_day_timed(room, sender, at).await?,
            Command::StartNight => store.start_night(room, sender).await?,
            Command::Remove(target) => store.remove_player(room, sender, target).await?,
            Command::EndGame => store.end_game(room, sender).await?,
        }
        Ok(())
    }

    /// Handles a pressed interactive option.
    pub async fn choose(&self, actor: PlayerId, token: &str) -> Result<(), TurncoatError> {
        Ok(self.store.choose(actor, token).await?)
    }

    /// The committed state of a room.
    pub async fn room(&self, room: RoomId) -> Result<Room, TurncoatError> {
        Ok(self.store.snapshot(room).await?)
    }

    pub async fn rooms(&self) -> Vec<RoomId> {
        self.store.rooms().await
    }

    /// The underlying session store.
    pub fn store(&self) -> &SessionStore<G> {
        &self.store
    }

    /// Stops all rooms and flushes state. Games resume on the next build.
    pub async fn shutdown(&self) {
        self.store.shutdown().await;
    }
}
