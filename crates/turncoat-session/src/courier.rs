//! Per-room outbound delivery.
//!
//! The room actor never awaits the gateway. It queues messages here and
//! carries on; the courier delivers them in order on its own task and
//! reports the handles of tracked messages back so they can be persisted.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use turncoat_game::Slot;
use turncoat_gateway::{Gateway, deliver, revise};
use turncoat_protocol::{Audience, Choice, MessageHandle, Notice, RoomId};

/// One outbound message operation.
#[derive(Debug)]
pub(crate) enum Delivery {
    Send {
        to: Audience,
        notice: Notice,
        options: Vec<Choice>,
        /// Slot to track, and the actor's sequence number for this send.
        track: Option<(Slot, u64)>,
    },
    Edit {
        slot: Slot,
        notice: Notice,
        options: Vec<Choice>,
    },
}

/// A tracked message was delivered under this handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct HandleIssued {
    pub(crate) slot: Slot,
    /// Sequence number the actor gave the send.
    pub(crate) seq: u64,
    pub(crate) handle: MessageHandle,
}

struct Courier<G> {
    room_id: RoomId,
    gateway: Arc<G>,
    slots: HashMap<Slot, MessageHandle>,
    receiver: mpsc::Receiver<Delivery>,
    issued: mpsc::UnboundedSender<HandleIssued>,
}

impl<G: Gateway> Courier<G> {
    async fn run(mut self) {
        while let Some(delivery) = self.receiver.recv().await {
            match delivery {
                Delivery::Send {
                    to,
                    notice,
                    options,
                    track,
                } => {
                    let handle = deliver(&*self.gateway, to, &notice, &options).await;
                    if let Some((slot, seq)) = track {
                        self.track(slot, seq, handle);
                    }
                }
                Delivery::Edit {
                    slot,
                    notice,
                    options,
                } => match self.slots.get(&slot) {
                    Some(&handle) => {
                        revise(&*self.gateway, handle, &notice, &options).await;
                    }
                    None => {
                        tracing::debug!(room_id = %self.room_id, ?slot, "edit skipped, message never delivered");
                    }
                },
            }
        }
        tracing::debug!(room_id = %self.room_id, "courier stopped");
    }

    fn track(&mut self, slot: Slot, seq: u64, handle: Option<MessageHandle>) {
        match handle {
            Some(handle) => {
                self.slots.insert(slot, handle);
                // The actor may already be gone if the room just closed.
                let _ = self.issued.send(HandleIssued { slot, seq, handle });
            }
            None => {
                // Never edit the previous occupant of the slot.
                self.slots.remove(&slot);
            }
        }
    }
}

/// Starts a courier for one room.
///
/// `slots` seeds the tracked handles (from a recovered room), so edits
/// after a restart land on the messages sent before it. Returns the
/// delivery queue and the stream of issued handles.
pub(crate) fn spawn_courier<G: Gateway>(
    room_id: RoomId,
    gateway: Arc<G>,
    slots: HashMap<Slot, MessageHandle>,
    queue: usize,
) -> (mpsc::Sender<Delivery>, mpsc::UnboundedReceiver<HandleIssued>) {
    let (sender, receiver) = mpsc::channel(queue);
    let (issued, issued_rx) = mpsc::unbounded_channel();
    let courier = Courier {
        room_id,
        gateway,
        slots,
        receiver,
        issued,
    };
    tokio::spawn(courier.run());
    (sender, issued_rx)
}
