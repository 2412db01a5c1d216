//! The persistence contract and its two implementations.
//!
//! The whole room table is saved and loaded as one mapping. Saves happen
//! after every committed mutation (through the snapshot writer), loads
//! once at startup.

use std::collections::BTreeMap;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use turncoat_game::Room;
use turncoat_protocol::{Codec, JsonCodec, RoomId};

use crate::{FileStoreConfig, PersistenceError};

/// The persisted room table.
pub type RoomTable = BTreeMap<RoomId, Room>;

/// Durable storage for the room table.
///
/// Methods return `impl Future + Send` (rather than `async fn`) so the
/// snapshot writer can call them from a spawned Tokio task.
pub trait Persistence: Send + Sync + 'static {
    /// Reads every persisted room. An empty store is an empty table,
    /// not an error.
    fn load_all(&self) -> impl Future<Output = Result<RoomTable, PersistenceError>> + Send;

    /// Replaces the persisted table with `rooms`.
    fn save_all(
        &self,
        rooms: &RoomTable,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;
}

// ---------------------------------------------------------------------------
// FileStore
// ---------------------------------------------------------------------------

/// Keeps the room table in a single file, encoded with `C`.
///
/// Writes go to a sibling temp file that is then renamed over the real
/// one, so a crash mid-save leaves the previous table intact.
#[derive(Debug, Clone)]
pub struct FileStore<C = JsonCodec> {
    path: PathBuf,
    codec: C,
}

/// The default file store: pretty-printed JSON.
pub type JsonFileStore = FileStore<JsonCodec>;

impl JsonFileStore {
    pub fn new(config: FileStoreConfig) -> Self {
        Self::with_codec(config, JsonCodec)
    }
}

impl<C: Codec> FileStore<C> {
    pub fn with_codec(config: FileStoreConfig, codec: C) -> Self {
        Self {
            path: config.path,
            codec,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl<C: Codec> Persistence for FileStore<C> {
    async fn load_all(&self) -> Result<RoomTable, PersistenceError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "no state file, starting empty");
                return Ok(RoomTable::new());
            }
            Err(e) => return Err(e.into()),
        };
        let rooms: RoomTable = self.codec.decode(&bytes)?;
        tracing::debug!(path = %self.path.display(), rooms = rooms.len(), "state loaded");
        Ok(rooms)
    }

    async fn save_all(&self, rooms: &RoomTable) -> Result<(), PersistenceError> {
        let bytes = self.codec.encode(rooms)?;
        let temp = self.temp_path();
        tokio::fs::write(&temp, &bytes).await?;
        tokio::fs::rename(&temp, &self.path).await?;
        tracing::trace!(path = %self.path.display(), rooms = rooms.len(), "state saved");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryPersistence
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Shelf {
    rooms: RoomTable,
}

/// Keeps the room table in memory. Clones share the same table, so a test
/// can hand one clone to a store, drop the store, and open a new store on
/// another clone to simulate a restart.
#[derive(Clone, Default)]
pub struct MemoryPersistence {
    shelf: Arc<Mutex<Shelf>>,
    saves: Arc<AtomicUsize>,
    failing: Arc<AtomicBool>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts with `rooms` already persisted.
    pub fn with_rooms(rooms: impl IntoIterator<Item = Room>) -> Self {
        let persistence = Self::default();
        persistence.lock().rooms = rooms.into_iter().map(|room| (room.id, room)).collect();
        persistence
    }

    /// The table as last saved.
    pub fn rooms(&self) -> RoomTable {
        self.lock().rooms.clone()
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Makes every following save fail (or succeed again).
    pub fn fail_saves(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn lock(&self) -> MutexGuard<'_, Shelf> {
        self.shelf.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Persistence for MemoryPersistence {
    async fn load_all(&self) -> Result<RoomTable, PersistenceError> {
        Ok(self.rooms())
    }

    async fn save_all(&self, rooms: &RoomTable) -> Result<(), PersistenceError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(io::Error::other("memory store set to fail").into());
        }
        self.lock().rooms = rooms.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
