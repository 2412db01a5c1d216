//! Side effects requested by a game operation.
//!
//! Operations never talk to the gateway or the clock themselves. They
//! mutate the room and return a list of [`Effect`]s, which the session
//! layer carries out in order once the new state is committed.

use turncoat_protocol::{Audience, Choice, Notice, PlayerId, RoomId, Timestamp};

use crate::TimerKind;

/// A message the engine keeps editing after it is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// The day's ballot in the room chat.
    Poll,
    /// The acting traitor's private night prompt.
    NightPrompt,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Send a new message. If `track` is set, its handle replaces whatever
    /// the slot pointed at and is reported back through
    /// [`Room::record_handle`](crate::Room::record_handle).
    Send {
        to: Audience,
        notice: Notice,
        options: Vec<Choice>,
        track: Option<Slot>,
    },
    /// Edit the message currently tracked in `slot`. Skipped if it was
    /// never delivered.
    Edit {
        slot: Slot,
        notice: Notice,
        options: Vec<Choice>,
    },
    /// Arm (or re-arm) the room's timer of this kind.
    Arm { kind: TimerKind, at: Timestamp },
    /// Disarm the room's timer of this kind.
    Cancel { kind: TimerKind },
    /// The game is over; delete the room.
    Close,
}

/// Accumulates effects during one operation.
#[derive(Debug, Default)]
pub(crate) struct Effects(Vec<Effect>);

impl Effects {
    pub(crate) fn send(
        &mut self,
        to: Audience,
        notice: Notice,
        options: Vec<Choice>,
        track: Option<Slot>,
    ) {
        self.0.push(Effect::Send {
            to,
            notice,
            options,
            track,
        });
    }

    pub(crate) fn announce(&mut self, room: RoomId, notice: Notice) {
        self.send(Audience::Room(room), notice, Vec::new(), None);
    }

    pub(crate) fn tell(&mut self, player: PlayerId, notice: Notice) {
        self.send(Audience::Player(player), notice, Vec::new(), None);
    }

    pub(crate) fn edit(&mut self, slot: Slot, notice: Notice, options: Vec<Choice>) {
        self.0.push(Effect::Edit {
            slot,
            notice,
            options,
        });
    }

    pub(crate) fn arm(&mut self, kind: TimerKind, at: Timestamp) {
        self.0.push(Effect::Arm { kind, at });
    }

    pub(crate) fn cancel(&mut self, kind: TimerKind) {
        self.0.push(Effect::Cancel { kind });
    }

    pub(crate) fn close(&mut self) {
        self.0.push(Effect::Close);
    }

    pub(crate) fn into_vec(self) -> Vec<Effect> {
        self.0
    }
}
