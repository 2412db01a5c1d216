//! In-memory gateway that records every request.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::Notify;
use turncoat_protocol::{Audience, Choice, MessageHandle, Notice, PlayerId, RoomId};

use crate::{Gateway, GatewayError};

/// A message the gateway was asked to send.
#[derive(Debug, Clone, PartialEq)]
pub struct Sent {
    pub handle: MessageHandle,
    pub notice: Notice,
    pub options: Vec<Choice>,
}

impl Sent {
    pub fn audience(&self) -> Audience {
        self.handle.audience
    }
}

/// An edit the gateway was asked to apply.
#[derive(Debug, Clone, PartialEq)]
pub struct Edit {
    pub handle: MessageHandle,
    pub notice: Notice,
    pub options: Vec<Choice>,
}

#[derive(Default)]
struct Log {
    sent: Vec<Sent>,
    edits: Vec<Edit>,
    unreachable: HashSet<PlayerId>,
}

/// A [`Gateway`] that keeps everything in memory.
///
/// Cheap to clone; clones share the same log. Private sends to players
/// marked with [`make_unreachable`](Self::make_unreachable) fail with
/// [`GatewayError::Unreachable`], which is how tests exercise the
/// best-effort delivery path.
#[derive(Clone, Default)]
pub struct RecordingGateway {
    log: Arc<Mutex<Log>>,
    next_id: Arc<AtomicU64>,
    activity: Arc<Notify>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every future private send to `player` fail.
    pub fn make_unreachable(&self, player: PlayerId) {
        self.lock().unreachable.insert(player);
    }

    /// Everything sent so far, in order.
    pub fn sent(&self) -> Vec<Sent> {
        self.lock().sent.clone()
    }

    /// Everything edited so far, in order.
    pub fn edits(&self) -> Vec<Edit> {
        self.lock().edits.clone()
    }

    /// Notices sent to one audience, in order.
    pub fn notices_to(&self, audience: Audience) -> Vec<Notice> {
        self.lock()
            .sent
            .iter()
            .filter(|s| s.audience() == audience)
            .map(|s| s.notice.clone())
            .collect()
    }

    /// The most recent send to `audience` whose notice matches `pred`.
    pub fn last_sent_matching(
        &self,
        audience: Audience,
        pred: impl Fn(&Notice) -> bool,
    ) -> Option<Sent> {
        self.lock()
            .sent
            .iter()
            .rev()
            .find(|s| s.audience() == audience && pred(&s.notice))
            .cloned()
    }

    /// Waits until the log contains a send or edit satisfying `pred`.
    ///
    /// Deliveries happen on background tasks, so tests use this instead of
    /// sleeping. Pair it with `tokio::time::timeout`.
    pub async fn wait_for(&self, pred: impl Fn(&[Sent], &[Edit]) -> bool) {
        loop {
            let notified = self.activity.notified();
            {
                let log = self.lock();
                if pred(&log.sent, &log.edits) {
                    return;
                }
            }
            notified.await;
        }
    }

    fn lock(&self) -> MutexGuard<'_, Log> {
        // A panic while holding the lock can only come from a test
        // assertion; the log itself is still usable.
        self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, audience: Audience, notice: &Notice, options: &[Choice]) -> MessageHandle {
        let handle = MessageHandle {
            audience,
            message_id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
        };
        self.lock().sent.push(Sent {
            handle,
            notice: notice.clone(),
            options: options.to_vec(),
        });
        self.activity.notify_waiters();
        handle
    }
}

impl Gateway for RecordingGateway {
    async fn send_to_room(
        &self,
        room: RoomId,
        notice: &Notice,
        options: &[Choice],
    ) -> Result<MessageHandle, GatewayError> {
        Ok(self.record(Audience::Room(room), notice, options))
    }

    async fn send_private(
        &self,
        player: PlayerId,
        notice: &Notice,
        options: &[Choice],
    ) -> Result<MessageHandle, GatewayError> {
        if self.lock().unreachable.contains(&player) {
            return Err(GatewayError::Unreachable(Audience::Player(player)));
        }
        Ok(self.record(Audience::Player(player), notice, options))
    }

    async fn edit_message(
        &self,
        handle: MessageHandle,
        notice: &Notice,
        options: &[Choice],
    ) -> Result<(), GatewayError> {
        let mut log = self.lock();
        if !log.sent.iter().any(|s| s.handle == handle) {
            return Err(GatewayError::UnknownMessage(handle));
        }
        log.edits.push(Edit {
            handle,
            notice: notice.clone(),
            options: options.to_vec(),
        });
        drop(log);
        self.activity.notify_waiters();
        Ok(())
    }
}
