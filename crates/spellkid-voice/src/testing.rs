//! Recording backend for tests: remembers every clip and lets the test decide
//! when (or whether) each one ends.

use crate::audio::{AudioBackend, Clip, ClipBody, OnEnded};
use crate::error::{VoiceError, VoiceResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

struct Started {
    label: String,
    at: Instant,
    on_ended: Option<OnEnded>,
}

/// Backend that records starts and halts.
///
/// Empty encoded clips are rejected as undecodable. With `auto_finish` set,
/// every accepted clip reports its natural end after that delay (tokio time).
#[derive(Default)]
pub struct RecordingBackend {
    started: Mutex<Vec<Started>>,
    halts: AtomicUsize,
    auto_finish: Option<Duration>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_auto_finish(length: Duration) -> Self {
        Self {
            auto_finish: Some(length),
            ..Self::default()
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Started>> {
        self.started.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Labels of every clip started, in order.
    pub fn started(&self) -> Vec<String> {
        self.lock().iter().map(|s| s.label.clone()).collect()
    }

    /// Labels with their start instants.
    pub fn timeline(&self) -> Vec<(String, Instant)> {
        self.lock().iter().map(|s| (s.label.clone(), s.at)).collect()
    }

    /// Number of clips started whose label equals `label`.
    pub fn count(&self, label: &str) -> usize {
        self.lock().iter().filter(|s| s.label == label).count()
    }

    pub fn halts(&self) -> usize {
        self.halts.load(Ordering::SeqCst)
    }

    /// Report the natural end of the most recent clip named `label`.
    /// Returns false when no such clip is still waiting to end.
    pub fn finish(&self, label: &str) -> bool {
        let on_ended = self
            .lock()
            .iter_mut()
            .rev()
            .find(|s| s.label == label && s.on_ended.is_some())
            .and_then(|s| s.on_ended.take());
        match on_ended {
            Some(on_ended) => {
                on_ended();
                true
            }
            None => false,
        }
    }
}

impl AudioBackend for RecordingBackend {
    fn start(&self, clip: &Clip, on_ended: OnEnded) -> VoiceResult<()> {
        if let ClipBody::Encoded(bytes) = &clip.body {
            if bytes.is_empty() {
                return Err(VoiceError::AssetUnavailable(clip.label.clone()));
            }
        }
        let on_ended = match self.auto_finish {
            Some(length) => {
                tokio::spawn(async move {
                    tokio::time::sleep(length).await;
                    on_ended();
                });
                None
            }
            None => Some(on_ended),
        };
        self.lock().push(Started {
            label: clip.label.clone(),
            at: Instant::now(),
            on_ended,
        });
        Ok(())
    }

    fn halt(&self) {
        self.halts.fetch_add(1, Ordering::SeqCst);
    }
}
