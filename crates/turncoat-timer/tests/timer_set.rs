//! Integration tests for the per-room timer set.
//!
//! Uses paused Tokio time so `sleep_until` resolves as soon as the runtime
//! is idle, and deadlines can be checked to the millisecond.

use std::fmt;
use std::time::Duration;

use tokio::time::Instant;
use turncoat_protocol::Timestamp;
use turncoat_timer::{TimerConfig, TimerSet};

// =========================================================================
// Helpers
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum Kind {
    Vote,
    Night,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

const NOW: Timestamp = Timestamp(1_000_000);

fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

/// The timer wheel has millisecond resolution, so allow a little slack.
fn assert_near(actual: Duration, expected: Duration) {
    let slack = Duration::from_millis(5);
    assert!(
        actual >= expected && actual <= expected + slack,
        "expected ~{expected:?}, got {actual:?}"
    );
}

fn timers() -> TimerSet<Kind> {
    TimerSet::new(TimerConfig::default())
}

// =========================================================================
// Arming and firing
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_fires_earliest_first() {
    let mut timers = timers();
    let start = Instant::now();
    timers.arm(Kind::Night, NOW + secs(10), NOW);
    timers.arm(Kind::Vote, NOW + secs(5), NOW);

    let first = timers.wait_for_fire().await;
    assert_eq!(first.kind, Kind::Vote);
    assert_eq!(first.at, NOW + secs(5));
    assert_near(start.elapsed(), secs(5));

    let second = timers.wait_for_fire().await;
    assert_eq!(second.kind, Kind::Night);
    assert_near(start.elapsed(), secs(10));
    assert!(timers.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_rearm_replaces_previous() {
    let mut timers = timers();
    let start = Instant::now();
    timers.arm(Kind::Vote, NOW + secs(5), NOW);

    let previous = timers.arm(Kind::Vote, NOW + secs(8), NOW);

    assert_eq!(previous, Some(NOW + secs(5)));
    assert_eq!(timers.len(), 1);
    let fired = timers.wait_for_fire().await;
    assert_eq!(fired.at, NOW + secs(8));
    assert_near(start.elapsed(), secs(8));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_disarms_only_that_kind() {
    let mut timers = timers();
    timers.arm(Kind::Vote, NOW + secs(5), NOW);
    timers.arm(Kind::Night, NOW + secs(9), NOW);

    assert_eq!(timers.cancel(Kind::Vote), Some(NOW + secs(5)));
    assert_eq!(timers.cancel(Kind::Vote), None);

    let fired = timers.wait_for_fire().await;
    assert_eq!(fired.kind, Kind::Night);
}

#[tokio::test(start_paused = true)]
async fn test_past_fire_time_fires_immediately() {
    let mut timers = timers();
    let start = Instant::now();
    timers.arm(Kind::Vote, Timestamp(NOW.as_millis() - 500), NOW);

    let fired = timers.wait_for_fire().await;
    assert_eq!(fired.kind, Kind::Vote);
    assert_near(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_empty_set_pends_forever() {
    let mut timers = timers();
    let result = tokio::time::timeout(secs(3600), timers.wait_for_fire()).await;
    assert!(result.is_err(), "an empty timer set must never fire");
}

#[tokio::test(start_paused = true)]
async fn test_dropped_wait_keeps_timer_armed() {
    let mut timers = timers();
    timers.arm(Kind::Vote, NOW + secs(10), NOW);

    // Lose a select! race before the deadline.
    let raced = tokio::time::timeout(secs(1), timers.wait_for_fire()).await;
    assert!(raced.is_err());
    assert_eq!(timers.get(Kind::Vote), Some(NOW + secs(10)));

    let fired = timers.wait_for_fire().await;
    assert_eq!(fired.kind, Kind::Vote);
}

#[tokio::test(start_paused = true)]
async fn test_late_wake_reports_lateness() {
    let mut timers = timers();
    timers.arm(Kind::Vote, NOW + secs(1), NOW);

    // Block past the deadline before polling.
    tokio::time::advance(secs(3)).await;

    let fired = timers.wait_for_fire().await;
    assert!(fired.late_by > secs(1) && fired.late_by <= secs(2));
}

#[tokio::test(start_paused = true)]
async fn test_clear_disarms_everything() {
    let mut timers = timers();
    timers.arm(Kind::Vote, NOW + secs(1), NOW);
    timers.arm(Kind::Night, NOW + secs(2), NOW);

    timers.clear();

    assert!(timers.is_empty());
    assert_eq!(timers.get(Kind::Night), None);
}
