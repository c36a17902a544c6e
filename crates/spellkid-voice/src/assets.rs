//! Recorded audio assets (phonics letters and phrases).

use crate::error::{VoiceError, VoiceResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Looks up encoded audio by asset name (e.g. `phonics/a.mp3`).
pub trait AudioAssets: Send + Sync {
    /// `Err(VoiceError::AssetUnavailable)` when the asset does not exist.
    fn resolve_audio(&self, name: &str) -> VoiceResult<Arc<[u8]>>;
}

/// Assets read from `<root>/audio/<name>`.
#[derive(Debug, Clone)]
pub struct DirAssets {
    root: PathBuf,
}

impl DirAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn audio_path(&self, name: &str) -> Option<PathBuf> {
        // Asset names are relative; refuse anything that would escape the root.
        let relative = Path::new(name);
        if relative.is_absolute() || relative.components().any(|c| c.as_os_str() == "..") {
            return None;
        }
        Some(self.root.join("audio").join(relative))
    }
}

impl AudioAssets for DirAssets {
    fn resolve_audio(&self, name: &str) -> VoiceResult<Arc<[u8]>> {
        let path = self
            .audio_path(name)
            .ok_or_else(|| VoiceError::AssetUnavailable(name.to_string()))?;
        match std::fs::read(&path) {
            Ok(bytes) if !bytes.is_empty() => Ok(bytes.into()),
            Ok(_) => Err(VoiceError::AssetUnavailable(format!("{} is empty", path.display()))),
            Err(e) => {
                debug!(asset = %path.display(), error = %e, "audio asset missing");
                Err(VoiceError::AssetUnavailable(name.to_string()))
            }
        }
    }
}

/// In-memory assets, keyed by asset name.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssets {
    audio: HashMap<String, Arc<[u8]>>,
    images: HashMap<String, PathBuf>,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_audio(mut self, name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        self.audio.insert(name.into(), bytes.into());
        self
    }

    pub fn with_image(mut self, reference: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.images.insert(reference.into(), path.into());
        self
    }

    /// Registered image path for `reference`.
    pub fn image(&self, reference: &str) -> Option<&Path> {
        self.images.get(reference).map(PathBuf::as_path)
    }
}

impl AudioAssets for MemoryAssets {
    fn resolve_audio(&self, name: &str) -> VoiceResult<Arc<[u8]>> {
        self.audio
            .get(name)
            .cloned()
            .ok_or_else(|| VoiceError::AssetUnavailable(name.to_string()))
    }
}
