//! Single-slot timers delivering tagged events to the session actor.
//!
//! Each slot owns at most one live [`TimerHandle`]. Arming always cancels the
//! previous handle first, and every fire carries the id it was armed with, so
//! a fire that was already queued when its handle was replaced is recognised
//! as stale and dropped.

use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::debug;

/// Identifies one arming of one slot.
pub type TimerId = u64;

/// The timers a session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    Reminder,
    Settle,
    Advance,
    CategoryDebounce,
    RaceLock,
}

/// A timer expiry as seen by the actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFired {
    pub kind: TimerKind,
    pub id: TimerId,
}

/// A live timer. Dropping it aborts the task, so it can never fire afterwards.
#[derive(Debug)]
pub struct TimerHandle {
    id: TimerId,
    repeating: bool,
    task: JoinHandle<()>,
}

impl TimerHandle {
    pub fn id(&self) -> TimerId {
        self.id
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[derive(Debug)]
pub struct TimerSlot {
    kind: TimerKind,
    events: UnboundedSender<TimerFired>,
    next_id: TimerId,
    live: Option<TimerHandle>,
}

impl TimerSlot {
    pub fn new(kind: TimerKind, events: UnboundedSender<TimerFired>) -> Self {
        Self {
            kind,
            events,
            next_id: 0,
            live: None,
        }
    }

    pub fn kind(&self) -> TimerKind {
        self.kind
    }

    fn install(&mut self, repeating: bool, task: impl FnOnce(TimerFired) -> JoinHandle<()>) -> TimerId {
        self.cancel();
        self.next_id += 1;
        let fired = TimerFired {
            kind: self.kind,
            id: self.next_id,
        };
        self.live = Some(TimerHandle {
            id: fired.id,
            repeating,
            task: task(fired),
        });
        fired.id
    }

    /// Fire once after `delay`.
    pub fn arm(&mut self, delay: Duration) -> TimerId {
        let events = self.events.clone();
        self.install(false, move |fired| {
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let _ = events.send(fired);
            })
        })
    }

    /// Fire after `first`, then every `every` until cancelled.
    pub fn arm_repeating(&mut self, first: Duration, every: Duration) -> TimerId {
        let events = self.events.clone();
        self.install(true, move |fired| {
            tokio::spawn(async move {
                tokio::time::sleep(first).await;
                while events.send(fired).is_ok() {
                    tokio::time::sleep(every).await;
                }
            })
        })
    }

    /// Drop the live handle, if any. Returns whether one was live.
    pub fn cancel(&mut self) -> bool {
        match self.live.take() {
            Some(handle) => {
                debug!(kind = ?self.kind, id = handle.id, "timer cancelled");
                true
            }
            None => false,
        }
    }

    pub fn is_live(&self) -> bool {
        self.live.is_some()
    }

    pub fn live_id(&self) -> Option<TimerId> {
        self.live.as_ref().map(TimerHandle::id)
    }

    /// Accept a fire. False when `id` is not the live handle (stale). A one-shot
    /// handle is consumed by its fire; a repeating one stays live.
    pub fn take_fire(&mut self, id: TimerId) -> bool {
        match &self.live {
            Some(handle) if handle.id == id => {
                if !handle.repeating {
                    // The task has already finished; forgetting it is enough.
                    self.live = None;
                }
                true
            }
            _ => {
                debug!(kind = ?self.kind, id, "stale timer fire dropped");
                false
            }
        }
    }
}
