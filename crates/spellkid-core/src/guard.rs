//! **InterruptionGuard** — collapses live audio and timers when the learner
//! leaves, plus the debounced category selector that feeds it.

use crate::ports::Celebration;
use crate::reminder::IdleReminderScheduler;
use crate::timer::{TimerFired, TimerId, TimerKind, TimerSlot};
use crate::words::CategoryFilter;
use serde::Serialize;
use spellkid_voice::{AudioResource, SpeechAnnouncer};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

/// Why live state is being collapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Interruption {
    PageHidden,
    WindowBlur,
    CategoryChange,
}

/// Stops every audible and pending thing without touching the word or input.
pub struct InterruptionGuard {
    audio: AudioResource,
    speech: Arc<SpeechAnnouncer>,
    celebration: Arc<dyn Celebration>,
}

impl InterruptionGuard {
    pub fn new(
        audio: AudioResource,
        speech: Arc<SpeechAnnouncer>,
        celebration: Arc<dyn Celebration>,
    ) -> Self {
        Self {
            audio,
            speech,
            celebration,
        }
    }

    /// Stop audio, cancel speech, disarm the reminder and drop the settle timer.
    /// A category change also clears the celebration.
    pub fn collapse(
        &self,
        cause: Interruption,
        reminder: &mut IdleReminderScheduler,
        settle: &mut TimerSlot,
    ) {
        info!(?cause, "interruption: collapsing audio and timers");
        self.audio.stop();
        self.speech.cancel();
        reminder.disarm();
        settle.cancel();
        if cause == Interruption::CategoryChange {
            self.celebration.clear();
        }
    }
}

/// Debounces category selections and holds the race-lock window after a commit.
#[derive(Debug)]
pub struct CategoryGate {
    pending: Option<CategoryFilter>,
    debounce: TimerSlot,
    race_lock: TimerSlot,
    debounce_window: Duration,
    lock_window: Duration,
}

impl CategoryGate {
    pub fn new(
        debounce_window: Duration,
        lock_window: Duration,
        events: UnboundedSender<TimerFired>,
    ) -> Self {
        Self {
            pending: None,
            debounce: TimerSlot::new(TimerKind::CategoryDebounce, events.clone()),
            race_lock: TimerSlot::new(TimerKind::RaceLock, events),
            debounce_window,
            lock_window,
        }
    }

    /// Record a selection and restart the quiet period.
    pub fn select(&mut self, filter: CategoryFilter) -> TimerId {
        debug!(?filter, "category selected; debouncing");
        self.pending = Some(filter);
        self.debounce.arm(self.debounce_window)
    }

    /// The latest selection not yet committed.
    pub fn pending(&self) -> Option<&CategoryFilter> {
        self.pending.as_ref()
    }

    /// Debounce expiry. Returns the filter to commit, or `None` for a stale
    /// fire or a selection equal to `applied`. A commit opens the race lock.
    pub fn on_debounce(&mut self, id: TimerId, applied: &CategoryFilter) -> Option<CategoryFilter> {
        if !self.debounce.take_fire(id) {
            return None;
        }
        let selected = self.pending.take()?;
        if &selected == applied {
            debug!(?selected, "category unchanged; nothing to apply");
            return None;
        }
        self.race_lock.arm(self.lock_window);
        Some(selected)
    }

    /// Race-lock expiry. True when the lock was actually released.
    pub fn on_race_lock(&mut self, id: TimerId) -> bool {
        self.race_lock.take_fire(id)
    }

    pub fn is_locked(&self) -> bool {
        self.race_lock.is_live()
    }

    /// Forget any pending selection and open windows.
    pub fn reset(&mut self) {
        self.pending = None;
        self.debounce.cancel();
        self.race_lock.cancel();
    }
}
