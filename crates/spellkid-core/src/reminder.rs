//! **IdleReminderScheduler** — replays the expected letter while the learner
//! pauses.
//!
//! The scheduler only owns the timer; what gets replayed is decided by the
//! session when the fire arrives, from the state at that moment.

use crate::timer::{TimerFired, TimerId, TimerKind, TimerSlot};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderState {
    Idle,
    Armed,
    /// Armed and has fired this many times since arming.
    Fired(u32),
}

#[derive(Debug)]
pub struct IdleReminderScheduler {
    slot: TimerSlot,
    state: ReminderState,
    interval: Duration,
}

impl IdleReminderScheduler {
    pub fn new(interval: Duration, events: UnboundedSender<TimerFired>) -> Self {
        Self {
            slot: TimerSlot::new(TimerKind::Reminder, events),
            state: ReminderState::Idle,
            interval,
        }
    }

    /// Disarm, then fire after `first` and every interval after that.
    pub fn arm(&mut self, first: Duration) -> TimerId {
        let id = self.slot.arm_repeating(first, self.interval);
        self.state = ReminderState::Armed;
        debug!(id, first_ms = first.as_millis() as u64, "reminder armed");
        id
    }

    /// Unconditionally stop reminding. Safe when idle.
    pub fn disarm(&mut self) {
        self.slot.cancel();
        self.state = ReminderState::Idle;
    }

    /// Accept a reminder fire. False for stale fires, which must be ignored.
    pub fn on_fire(&mut self, id: TimerId) -> bool {
        if !self.slot.take_fire(id) {
            return false;
        }
        self.state = match self.state {
            ReminderState::Fired(n) => ReminderState::Fired(n + 1),
            _ => ReminderState::Fired(1),
        };
        true
    }

    pub fn state(&self) -> ReminderState {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        self.slot.is_live()
    }
}
