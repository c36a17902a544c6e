//! **AudioResource** — the single audible slot.
//!
//! Every `play` bumps a generation counter, resolves the previous session as
//! superseded and halts the backend before starting the new clip. Completion
//! callbacks capture their generation; one that arrives after its session was
//! replaced or stopped is stale and dropped.

use crate::error::VoiceResult;
use crate::tone::Tone;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// What kind of sound owns the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSource {
    PhonicsLetter,
    PhonicsPhrase,
    Speech,
}

/// How a playback session ended. Only `Finished` counts as success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// Played to its natural end.
    Finished,
    /// A later `play` took the slot.
    Superseded,
    /// `stop()` was called while it was audible.
    Stopped,
    /// The clip could not be loaded or decoded.
    Unavailable,
}

impl PlaybackOutcome {
    pub fn is_success(self) -> bool {
        self == PlaybackOutcome::Finished
    }

    /// True when something else ended this session early.
    pub fn was_cut_short(self) -> bool {
        matches!(self, PlaybackOutcome::Superseded | PlaybackOutcome::Stopped)
    }
}

/// Audio payload handed to a backend.
#[derive(Debug, Clone)]
pub enum ClipBody {
    /// Encoded file bytes (mp3, wav, ogg, flac).
    Encoded(Arc<[u8]>),
    /// Synthesized fallback tone.
    Tone(Tone),
}

/// A labelled clip. The label names the asset or tone and shows up in logs.
#[derive(Debug, Clone)]
pub struct Clip {
    pub label: String,
    pub body: ClipBody,
}

impl Clip {
    pub fn encoded(label: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            label: label.into(),
            body: ClipBody::Encoded(bytes.into()),
        }
    }

    pub fn tone(label: impl Into<String>, tone: Tone) -> Self {
        Self {
            label: label.into(),
            body: ClipBody::Tone(tone),
        }
    }

    /// Length when it is known without decoding.
    pub fn nominal_duration(&self) -> Option<Duration> {
        match &self.body {
            ClipBody::Tone(tone) => Some(tone.duration),
            ClipBody::Encoded(_) => None,
        }
    }
}

/// Natural-end notification handed to a backend with each clip.
pub type OnEnded = Box<dyn FnOnce() + Send + 'static>;

/// Output device behind the [`AudioResource`].
pub trait AudioBackend: Send + Sync {
    /// Start `clip`. Call `on_ended` once when it stops producing sound for any
    /// reason; the resource filters out calls for sessions it no longer owns.
    /// An `Err` means the clip cannot be played at all.
    fn start(&self, clip: &Clip, on_ended: OnEnded) -> VoiceResult<()>;

    /// Silence output and release the device handle. Must be safe when idle.
    fn halt(&self);
}

struct ActiveSession {
    generation: u64,
    source: SessionSource,
    label: String,
    done: oneshot::Sender<PlaybackOutcome>,
}

#[derive(Default)]
struct Slot {
    generation: u64,
    active: Option<ActiveSession>,
}

struct Shared {
    backend: Arc<dyn AudioBackend>,
    slot: Mutex<Slot>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Resolve the session for `generation` if it still owns the slot.
    fn settle(&self, generation: u64, outcome: PlaybackOutcome) -> bool {
        let mut slot = self.lock();
        match slot.active.take() {
            Some(active) if active.generation == generation => {
                debug!(clip = %active.label, ?outcome, "playback settled");
                let _ = active.done.send(outcome);
                true
            }
            other => {
                slot.active = other;
                debug!(generation, ?outcome, "stale playback completion ignored");
                false
            }
        }
    }
}

/// Exclusive audio output. Cheap to clone; clones share the slot.
#[derive(Clone)]
pub struct AudioResource {
    shared: Arc<Shared>,
}

impl AudioResource {
    pub fn new(backend: Arc<dyn AudioBackend>) -> Self {
        Self {
            shared: Arc::new(Shared {
                backend,
                slot: Mutex::new(Slot::default()),
            }),
        }
    }

    /// Stop whatever is audible and start `clip`.
    pub fn play(&self, source: SessionSource, clip: Clip) -> Playback {
        let (done_tx, done_rx) = oneshot::channel();
        let generation = {
            let mut slot = self.shared.lock();
            slot.generation += 1;
            let generation = slot.generation;
            if let Some(previous) = slot.active.take() {
                debug!(clip = %previous.label, "superseded by {}", clip.label);
                let _ = previous.done.send(PlaybackOutcome::Superseded);
            }
            slot.active = Some(ActiveSession {
                generation,
                source,
                label: clip.label.clone(),
                done: done_tx,
            });
            generation
        };

        self.shared.backend.halt();

        let shared = Arc::downgrade(&self.shared);
        let on_ended: OnEnded = Box::new(move || {
            if let Some(shared) = shared.upgrade() {
                shared.settle(generation, PlaybackOutcome::Finished);
            }
        });

        if let Err(e) = self.shared.backend.start(&clip, on_ended) {
            warn!(clip = %clip.label, error = %e, "clip unavailable");
            self.shared.settle(generation, PlaybackOutcome::Unavailable);
        }

        Playback {
            generation,
            outcome: done_rx,
        }
    }

    /// Silence output. Idempotent; always advances the generation so that any
    /// checkpointed sequence waiting between clips notices the interruption.
    pub fn stop(&self) {
        let stopped = {
            let mut slot = self.shared.lock();
            slot.generation += 1;
            slot.active.take()
        };
        if let Some(active) = stopped {
            debug!(clip = %active.label, "playback stopped");
            let _ = active.done.send(PlaybackOutcome::Stopped);
        }
        self.shared.backend.halt();
    }

    /// Current generation; changes on every `play` and `stop`.
    pub fn generation(&self) -> u64 {
        self.shared.lock().generation
    }

    pub fn is_playing(&self) -> bool {
        self.shared.lock().active.is_some()
    }

    pub fn current_source(&self) -> Option<SessionSource> {
        self.shared.lock().active.as_ref().map(|a| a.source)
    }

    pub fn current_label(&self) -> Option<String> {
        self.shared.lock().active.as_ref().map(|a| a.label.clone())
    }
}

/// Completion handle returned by [`AudioResource::play`].
#[derive(Debug)]
pub struct Playback {
    generation: u64,
    outcome: oneshot::Receiver<PlaybackOutcome>,
}

impl Playback {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Resolves exactly once with how the session ended.
    pub async fn finished(self) -> PlaybackOutcome {
        self.outcome.await.unwrap_or(PlaybackOutcome::Stopped)
    }
}

/// Backend with no device: each clip "plays" for its nominal length.
///
/// Useful on machines without an output device and for headless runs.
pub struct SilentBackend {
    encoded_length: Duration,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl SilentBackend {
    pub fn new() -> Self {
        Self::with_encoded_length(Duration::from_millis(300))
    }

    /// Pretend every encoded clip lasts `length`.
    pub fn with_encoded_length(length: Duration) -> Self {
        Self {
            encoded_length: length,
            timer: Mutex::new(None),
        }
    }
}

impl Default for SilentBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for SilentBackend {
    fn start(&self, clip: &Clip, on_ended: OnEnded) -> VoiceResult<()> {
        let length = clip.nominal_duration().unwrap_or(self.encoded_length);
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            on_ended();
            return Ok(());
        };
        let task = runtime.spawn(async move {
            tokio::time::sleep(length).await;
            on_ended();
        });
        let mut timer = self.timer.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(previous) = timer.replace(task) {
            previous.abort();
        }
        Ok(())
    }

    fn halt(&self) {
        let mut timer = self.timer.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(task) = timer.take() {
            task.abort();
        }
    }
}
