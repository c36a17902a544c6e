//! Narrow interfaces to the collaborators around the trainer: settings, the
//! celebration renderer, haptics and image lookup.

use crate::config::{DisplayOrder, TrainerConfig};
use serde::Serialize;
use spellkid_voice::{DirAssets, MemoryAssets};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info};

/// Learner-facing settings, read when they are needed rather than cached.
pub trait Settings: Send + Sync {
    fn celebration_enabled(&self) -> bool;
    fn image_display_order(&self) -> DisplayOrder;
}

/// External reward sequence shown after a word is spelled.
pub trait Celebration: Send + Sync {
    fn trigger(&self);
    /// Remove any celebration still on screen.
    fn clear(&self);
}

/// Fire-and-forget vibration.
pub trait Haptics: Send + Sync {
    fn pulse(&self, duration: Duration);
}

/// A resolved picture for the active word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageHandle {
    pub reference: String,
    pub path: PathBuf,
}

/// Maps a word's image reference to something displayable. `None` is tolerated.
pub trait ImageResolver: Send + Sync {
    fn resolve_image(&self, reference: &str) -> Option<ImageHandle>;
}

impl ImageResolver for DirAssets {
    fn resolve_image(&self, reference: &str) -> Option<ImageHandle> {
        let relative = reference.trim_start_matches('/');
        if relative.is_empty() || relative.split('/').any(|part| part == "..") {
            return None;
        }
        let path = self.root().join(relative);
        if !path.is_file() {
            debug!(image = %path.display(), "word image missing");
            return None;
        }
        Some(ImageHandle {
            reference: reference.to_string(),
            path,
        })
    }
}

impl ImageResolver for MemoryAssets {
    fn resolve_image(&self, reference: &str) -> Option<ImageHandle> {
        self.image(reference).map(|path| ImageHandle {
            reference: reference.to_string(),
            path: path.to_path_buf(),
        })
    }
}

/// Settings that can be flipped while a session runs.
#[derive(Debug)]
pub struct SharedSettings {
    celebration_enabled: AtomicBool,
    reversed: AtomicBool,
}

impl SharedSettings {
    pub fn new(celebration_enabled: bool, order: DisplayOrder) -> Self {
        Self {
            celebration_enabled: AtomicBool::new(celebration_enabled),
            reversed: AtomicBool::new(order == DisplayOrder::Reversed),
        }
    }

    pub fn set_celebration_enabled(&self, enabled: bool) {
        self.celebration_enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn set_display_order(&self, order: DisplayOrder) {
        self.reversed.store(order == DisplayOrder::Reversed, Ordering::SeqCst);
    }
}

impl From<&TrainerConfig> for SharedSettings {
    fn from(config: &TrainerConfig) -> Self {
        Self::new(config.celebration_enabled, config.display_order)
    }
}

impl Settings for SharedSettings {
    fn celebration_enabled(&self) -> bool {
        self.celebration_enabled.load(Ordering::SeqCst)
    }

    fn image_display_order(&self) -> DisplayOrder {
        if self.reversed.load(Ordering::SeqCst) {
            DisplayOrder::Reversed
        } else {
            DisplayOrder::Forward
        }
    }
}

/// Celebration that only logs; counts triggers.
#[derive(Debug, Default)]
pub struct TracingCelebration {
    triggered: AtomicU64,
}

impl TracingCelebration {
    pub fn triggered(&self) -> u64 {
        self.triggered.load(Ordering::SeqCst)
    }
}

impl Celebration for TracingCelebration {
    fn trigger(&self) {
        let n = self.triggered.fetch_add(1, Ordering::SeqCst) + 1;
        info!(celebrations = n, "🎉 celebration");
    }

    fn clear(&self) {
        debug!("celebration cleared");
    }
}

/// Haptics that only log.
#[derive(Debug, Default)]
pub struct TracingHaptics;

impl Haptics for TracingHaptics {
    fn pulse(&self, duration: Duration) {
        debug!(ms = duration.as_millis() as u64, "haptic pulse");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dir_images_resolve_relative_to_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("apple.svg"), "<svg/>").unwrap();
        let assets = DirAssets::new(dir.path());

        let handle = assets.resolve_image("/apple.svg").unwrap();
        assert_eq!(handle.path, dir.path().join("apple.svg"));
        assert_eq!(handle.reference, "/apple.svg");
        assert!(assets.resolve_image("pear.svg").is_none());
        assert!(assets.resolve_image("../apple.svg").is_none());
        assert!(assets.resolve_image("").is_none());
    }

    #[test]
    fn shared_settings_follow_updates() {
        let settings = SharedSettings::from(&TrainerConfig::default());
        assert!(settings.celebration_enabled());
        settings.set_celebration_enabled(false);
        settings.set_display_order(DisplayOrder::Reversed);
        assert!(!settings.celebration_enabled());
        assert_eq!(settings.image_display_order(), DisplayOrder::Reversed);
    }
}
