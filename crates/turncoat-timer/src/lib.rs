//! Wall-clock deadline timers for Turncoat room actors.
//!
//! A room has at most one pending timer of each kind (vote, transition,
//! nightfall). Fire times are absolute [`Timestamp`]s because they are
//! persisted and must survive a restart; the live deadline is a Tokio
//! instant computed from the delay remaining when the timer is armed.
//!
//! # Integration
//!
//! One `TimerSet` per room actor, polled from the actor's `select!` loop:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* handle commands */ }
//!         fired = timers.wait_for_fire() => {
//!             room.timer_fired(fired.kind, fired.at, &mut ctx);
//!         }
//!     }
//! }
//! ```
//!
//! Rooms never share a timer structure, so a busy room cannot delay
//! another room's deadlines.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::time::Duration;

use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace, warn};
use turncoat_protocol::Timestamp;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct TimerConfig {
    /// A fire that wakes later than this past its deadline is logged as a
    /// warning (the runtime was starved, or the host was suspended).
    pub late_warn_threshold: Duration,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            late_warn_threshold: Duration::from_secs(5),
        }
    }
}

// ---------------------------------------------------------------------------
// Fired
// ---------------------------------------------------------------------------

/// A timer that reached its deadline, returned by
/// [`TimerSet::wait_for_fire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fired<K> {
    pub kind: K,
    /// The fire time the timer was armed with.
    pub at: Timestamp,
    /// How far past the deadline the wake-up happened.
    pub late_by: Duration,
}

// ---------------------------------------------------------------------------
// TimerSet
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Entry {
    at: Timestamp,
    deadline: TokioInstant,
}

/// The pending timers of one room, keyed by kind.
///
/// Arming a kind that is already armed replaces it. Dropping the set
/// drops every pending timer with it.
pub struct TimerSet<K> {
    config: TimerConfig,
    entries: HashMap<K, Entry>,
}

impl<K> TimerSet<K>
where
    K: Copy + Eq + Hash + Ord + fmt::Display,
{
    pub fn new(config: TimerConfig) -> Self {
        Self {
            config,
            entries: HashMap::new(),
        }
    }

    /// Arms `kind` to fire at `at`, given that it is `now`.
    ///
    /// A fire time at or before `now` fires on the next poll. Returns the
    /// fire time this replaced, if any.
    pub fn arm(&mut self, kind: K, at: Timestamp, now: Timestamp) -> Option<Timestamp> {
        let delay = at.saturating_duration_since(now);
        let entry = Entry {
            at,
            deadline: TokioInstant::now() + delay,
        };
        let previous = self.entries.insert(kind, entry).map(|e| e.at);
        debug!(%kind, %at, ?delay, replaced = previous.is_some(), "timer armed");
        previous
    }

    /// Disarms `kind`. Returns its fire time if it was armed.
    pub fn cancel(&mut self, kind: K) -> Option<Timestamp> {
        let removed = self.entries.remove(&kind).map(|e| e.at);
        if let Some(at) = removed {
            debug!(%kind, %at, "timer cancelled");
        }
        removed
    }

    /// Disarms everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Fire time of `kind`, if armed.
    pub fn get(&self, kind: K) -> Option<Timestamp> {
        self.entries.get(&kind).map(|e| e.at)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Waits for the earliest pending timer and disarms it.
    ///
    /// With nothing armed this future pends forever, leaving the other
    /// branches of a `select!` to make progress. It is cancel-safe: a timer
    /// is only disarmed once its deadline has passed and the future
    /// completes.
    pub async fn wait_for_fire(&mut self) -> Fired<K> {
        let Some((kind, entry)) = self.next_due() else {
            return std::future::pending().await;
        };

        time::sleep_until(entry.deadline).await;
        self.entries.remove(&kind);

        let late_by = TokioInstant::now().saturating_duration_since(entry.deadline);
        if late_by > self.config.late_warn_threshold {
            warn!(%kind, at = %entry.at, late_ms = late_by.as_millis() as u64, "timer fired late");
        } else {
            trace!(%kind, at = %entry.at, "timer fired");
        }

        Fired {
            kind,
            at: entry.at,
            late_by,
        }
    }

    /// Earliest deadline; ties go to the smaller kind.
    fn next_due(&self) -> Option<(K, Entry)> {
        self.entries
            .iter()
            .min_by_key(|(kind, entry)| (entry.deadline, **kind))
            .map(|(kind, entry)| (*kind, *entry))
    }
}

impl<K> Default for TimerSet<K>
where
    K: Copy + Eq + Hash + Ord + fmt::Display,
{
    fn default() -> Self {
        Self::new(TimerConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Recovery
// ---------------------------------------------------------------------------

/// Persisted timers sorted into those still worth arming and those whose
/// time passed while the process was down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recovery<K> {
    pub pending: Vec<(K, Timestamp)>,
    pub expired: Vec<(K, Timestamp)>,
}

/// Splits persisted timers at `now`. Timers due exactly at `now` count as
/// expired.
pub fn recover<K>(timers: impl IntoIterator<Item = (K, Timestamp)>, now: Timestamp) -> Recovery<K> {
    let (pending, expired) = timers.into_iter().partition(|(_, at)| *at > now);
    Recovery { pending, expired }
}
