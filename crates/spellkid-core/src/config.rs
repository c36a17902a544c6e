//! Trainer configuration.
//!
//! Precedence: environment (`SPELLKID_*`, nested keys split on `__`) > TOML
//! file at `SPELLKID_CONFIG` (default `config/spellkid.toml`) > defaults.

use crate::error::TrainerResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file used when `SPELLKID_CONFIG` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "config/spellkid.toml";

/// Order the filtered deck is shown in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayOrder {
    #[default]
    Forward,
    Reversed,
}

/// Delays driving reminders, feedback and progression, in milliseconds.
///
/// | Env | Default |
/// |-----|---------|
/// | SPELLKID_TIMING__FIRST_REMINDER_MS | 3000 |
/// | SPELLKID_TIMING__REMINDER_INTERVAL_MS | 2500 |
/// | SPELLKID_TIMING__SETTLE_MS | 400 |
/// | SPELLKID_TIMING__ADVANCE_WITH_CELEBRATION_MS | 6000 |
/// | SPELLKID_TIMING__ADVANCE_WITHOUT_CELEBRATION_MS | 4000 |
/// | SPELLKID_TIMING__CATEGORY_DEBOUNCE_MS | 250 |
/// | SPELLKID_TIMING__RACE_LOCK_MS | 200 |
/// | SPELLKID_TIMING__LETTER_GAP_MS | 200 |
/// | SPELLKID_TIMING__HAPTIC_PULSE_MS | 50 |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Pause before the first idle reminder of a freshly presented word.
    pub first_reminder_ms: u64,
    /// Pause before a reminder after a prompted letter, and between repeats.
    pub reminder_interval_ms: u64,
    /// Quiet period after a keystroke before the next letter is prompted.
    pub settle_ms: u64,
    pub advance_with_celebration_ms: u64,
    pub advance_without_celebration_ms: u64,
    pub category_debounce_ms: u64,
    /// Rendering is suppressed for this long after a category commit.
    pub race_lock_ms: u64,
    /// Gap between letters when a phrase is spelled out.
    pub letter_gap_ms: u64,
    pub haptic_pulse_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            first_reminder_ms: 3000,
            reminder_interval_ms: 2500,
            settle_ms: 400,
            advance_with_celebration_ms: 6000,
            advance_without_celebration_ms: 4000,
            category_debounce_ms: 250,
            race_lock_ms: 200,
            letter_gap_ms: 200,
            haptic_pulse_ms: 50,
        }
    }
}

impl TimingConfig {
    pub fn first_reminder(&self) -> Duration {
        Duration::from_millis(self.first_reminder_ms)
    }

    pub fn reminder_interval(&self) -> Duration {
        Duration::from_millis(self.reminder_interval_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    /// Delay between completion and the next word.
    pub fn advance(&self, celebration_enabled: bool) -> Duration {
        Duration::from_millis(if celebration_enabled {
            self.advance_with_celebration_ms
        } else {
            self.advance_without_celebration_ms
        })
    }

    pub fn category_debounce(&self) -> Duration {
        Duration::from_millis(self.category_debounce_ms)
    }

    pub fn race_lock(&self) -> Duration {
        Duration::from_millis(self.race_lock_ms)
    }

    pub fn letter_gap(&self) -> Duration {
        Duration::from_millis(self.letter_gap_ms)
    }

    pub fn haptic_pulse(&self) -> Duration {
        Duration::from_millis(self.haptic_pulse_ms)
    }
}

/// Top-level trainer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// JSON word list (`{ "words": [...], "categories": [...] }`).
    pub words_path: PathBuf,
    /// Root holding `audio/phonics/*.mp3` and word images.
    pub assets_root: PathBuf,
    pub celebration_enabled: bool,
    pub display_order: DisplayOrder,
    /// Speak the word (and definition) once it is spelled.
    pub announce_on_complete: bool,
    pub timing: TimingConfig,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            words_path: PathBuf::from("data/words.json"),
            assets_root: PathBuf::from("public"),
            celebration_enabled: true,
            display_order: DisplayOrder::Forward,
            announce_on_complete: true,
            timing: TimingConfig::default(),
        }
    }
}

impl TrainerConfig {
    /// Load from `SPELLKID_CONFIG` (or the default path) and the environment.
    pub fn load() -> TrainerResult<Self> {
        let config_path =
            std::env::var("SPELLKID_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(Path::new(&config_path))
    }

    /// Load from `path` (skipped when missing) and the environment.
    pub fn load_from(path: &Path) -> TrainerResult<Self> {
        let builder = config::Config::builder()
            .add_source(config::Config::try_from(&TrainerConfig::default())?);

        let builder = if path.exists() {
            builder.add_source(config::File::from(path))
        } else {
            builder
        };

        let built = builder
            .add_source(
                config::Environment::with_prefix("SPELLKID")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(built.try_deserialize()?)
    }

    /// Render as TOML, e.g. to seed a config file.
    pub fn to_toml(&self) -> TrainerResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    #[test]
    fn defaults_match_reference_timings() {
        let timing = TimingConfig::default();
        assert_eq!(timing.first_reminder(), Duration::from_millis(3000));
        assert_eq!(timing.settle(), Duration::from_millis(400));
        assert_eq!(timing.advance(true), Duration::from_millis(6000));
        assert_eq!(timing.advance(false), Duration::from_millis(4000));
        assert_eq!(timing.category_debounce(), Duration::from_millis(250));
        assert_eq!(timing.race_lock(), Duration::from_millis(200));
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spellkid.toml");
        std::fs::write(
            &path,
            "celebration_enabled = false\ndisplay_order = \"reversed\"\n\n[timing]\nsettle_ms = 300\n",
        )
        .unwrap();

        let config = assert_ok!(TrainerConfig::load_from(&path));
        assert!(!config.celebration_enabled);
        assert_eq!(config.display_order, DisplayOrder::Reversed);
        assert_eq!(config.timing.settle_ms, 300);
        assert_eq!(config.timing.first_reminder_ms, 3000);
        assert!(config.announce_on_complete);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = TrainerConfig::load_from(Path::new("/nonexistent/spellkid.toml")).unwrap();
        assert_eq!(config.timing, TimingConfig::default());
        assert!(config.celebration_enabled);
    }

    #[test]
    fn rendered_toml_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spellkid.toml");
        let mut config = TrainerConfig::default();
        config.timing.letter_gap_ms = 150;
        std::fs::write(&path, config.to_toml().unwrap()).unwrap();

        assert_eq!(TrainerConfig::load_from(&path).unwrap().timing.letter_gap_ms, 150);
    }
}
