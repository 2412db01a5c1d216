//! Session layer for Turncoat.
//!
//! Connects the pure game rules to the outside world:
//!
//! - [`SessionStore`] owns the live rooms. Each room runs as its own
//!   Tokio task (an actor) that serialises every operation on it,
//!   including timer fires, so rooms never contend with each other.
//! - Each room has a courier task that delivers its messages through the
//!   [`Gateway`](turncoat_gateway::Gateway), so a slow chat API never
//!   holds up a transition.
//! - A single snapshot writer saves the room table through a
//!   [`Persistence`] implementation after every committed change.
//!   [`JsonFileStore`] keeps it in a JSON file; [`MemoryPersistence`] is
//!   for tests.
//! - On startup, persisted rooms are validated and their timers re-armed.

mod actor;
mod config;
mod courier;
mod error;
mod persistence;
mod persister;
mod store;

pub use config::{
    DEFAULT_COURIER_QUEUE, DEFAULT_MAILBOX_SIZE, DEFAULT_STATE_PATH, FileStoreConfig, StoreConfig,
};
pub use error::{PersistenceError, StoreError};
pub use persistence::{FileStore, JsonFileStore, MemoryPersistence, Persistence, RoomTable};
pub use store::SessionStore;
