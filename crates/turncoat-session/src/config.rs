//! Session store configuration.

use std::path::PathBuf;

use turncoat_game::GameConfig;
use turncoat_timer::TimerConfig;

/// Command channel size for room actors.
pub const DEFAULT_MAILBOX_SIZE: usize = 64;

/// Outbound message queue per room.
pub const DEFAULT_COURIER_QUEUE: usize = 256;

/// Default location of the JSON state blob.
pub const DEFAULT_STATE_PATH: &str = "turncoat_state.json";

/// Settings for a [`SessionStore`](crate::SessionStore).
///
/// Fields are public so callers can use struct update syntax:
///
/// ```rust
/// use turncoat_session::StoreConfig;
///
/// let config = StoreConfig {
///     courier_queue: 32,
///     ..Default::default()
/// };
/// assert_eq!(config.mailbox_size, 64);
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Commands a room actor buffers before callers wait.
    pub mailbox_size: usize,
    /// Outbound messages a room buffers while the gateway is slow. When
    /// full, further messages are dropped with a warning rather than
    /// stalling the room.
    pub courier_queue: usize,
    /// Rules shared by every room.
    pub game: GameConfig,
    pub timers: TimerConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            mailbox_size: DEFAULT_MAILBOX_SIZE,
            courier_queue: DEFAULT_COURIER_QUEUE,
            game: GameConfig::default(),
            timers: TimerConfig::default(),
        }
    }
}

impl StoreConfig {
    /// Replaces zero-sized queues (which Tokio rejects) with the defaults
    /// and validates the game rules.
    pub fn validated(mut self) -> Self {
        if self.mailbox_size == 0 {
            tracing::warn!(default = DEFAULT_MAILBOX_SIZE, "mailbox_size 0, using default");
            self.mailbox_size = DEFAULT_MAILBOX_SIZE;
        }
        if self.courier_queue == 0 {
            tracing::warn!(default = DEFAULT_COURIER_QUEUE, "courier_queue 0, using default");
            self.courier_queue = DEFAULT_COURIER_QUEUE;
        }
        self.game = self.game.validated();
        self
    }
}

/// Where [`JsonFileStore`](crate::JsonFileStore) keeps its blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStoreConfig {
    pub path: PathBuf,
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_STATE_PATH),
        }
    }
}
