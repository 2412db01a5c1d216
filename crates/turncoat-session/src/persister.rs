//! The snapshot writer: one task that owns the durable copy of the room
//! table.
//!
//! Room actors hand it their committed state and move on. Snapshots that
//! queue up while a save is in flight are folded into the next save, so
//! a burst of votes costs one write, not one per vote.

use tokio::sync::{mpsc, oneshot};
use turncoat_game::Room;
use turncoat_protocol::RoomId;

use crate::persistence::{Persistence, RoomTable};

enum Snapshot {
    Upsert(Box<Room>),
    Remove(RoomId),
    Flush(oneshot::Sender<()>),
}

/// Sends snapshots to the writer. Cheap to clone.
#[derive(Clone)]
pub(crate) struct PersisterHandle {
    sender: mpsc::UnboundedSender<Snapshot>,
}

impl PersisterHandle {
    /// Queues the committed state of a room.
    pub(crate) fn upsert(&self, room: Room) {
        if self.sender.send(Snapshot::Upsert(Box::new(room))).is_err() {
            tracing::error!("snapshot writer gone, state not persisted");
        }
    }

    /// Queues the deletion of a closed room.
    pub(crate) fn remove(&self, room_id: RoomId) {
        if self.sender.send(Snapshot::Remove(room_id)).is_err() {
            tracing::error!(%room_id, "snapshot writer gone, removal not persisted");
        }
    }

    /// Waits until everything queued before this call has been written
    /// (or has failed to write).
    pub(crate) async fn flush(&self) {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.sender.send(Snapshot::Flush(reply_tx)).is_ok() {
            let _ = reply_rx.await;
        }
    }
}

struct Persister<P> {
    persistence: P,
    rooms: RoomTable,
    dirty: bool,
    receiver: mpsc::UnboundedReceiver<Snapshot>,
}

impl<P: Persistence> Persister<P> {
    async fn run(mut self) {
        if self.dirty {
            self.save().await;
        }
        while let Some(first) = self.receiver.recv().await {
            let mut waiters = Vec::new();
            self.absorb(first, &mut waiters);
            while let Ok(next) = self.receiver.try_recv() {
                self.absorb(next, &mut waiters);
            }
            if self.dirty {
                self.save().await;
            }
            for waiter in waiters {
                let _ = waiter.send(());
            }
        }
        tracing::debug!("snapshot writer stopped");
    }

    fn absorb(&mut self, snapshot: Snapshot, waiters: &mut Vec<oneshot::Sender<()>>) {
        match snapshot {
            Snapshot::Upsert(room) => {
                self.rooms.insert(room.id, *room);
                self.dirty = true;
            }
            Snapshot::Remove(room_id) => {
                self.dirty |= self.rooms.remove(&room_id).is_some();
            }
            Snapshot::Flush(reply) => waiters.push(reply),
        }
    }

    /// A failed save is logged and retried with the next snapshot; the
    /// in-memory rooms carry on regardless.
    async fn save(&mut self) {
        match self.persistence.save_all(&self.rooms).await {
            Ok(()) => tracing::trace!(rooms = self.rooms.len(), "snapshot written"),
            Err(e) => tracing::error!(error = %e, rooms = self.rooms.len(), "snapshot write failed"),
        }
        self.dirty = false;
    }
}

/// Starts the writer with `rooms` as the durable copy. If `save_now` is
/// set the table is written once straight away.
pub(crate) fn spawn_persister<P: Persistence>(
    persistence: P,
    rooms: RoomTable,
    save_now: bool,
) -> PersisterHandle {
    let (sender, receiver) = mpsc::unbounded_channel();
    let persister = Persister {
        persistence,
        rooms,
        dirty: save_now,
        receiver,
    };
    tokio::spawn(persister.run());
    PersisterHandle { sender }
}
