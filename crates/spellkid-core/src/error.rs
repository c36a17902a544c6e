//! Error types for the trainer core.

use thiserror::Error;

/// Result type alias for trainer operations
pub type TrainerResult<T> = Result<T, TrainerError>;

/// Failures surfaced while setting a session up.
///
/// Once a session is running nothing here is fatal: playback and speech
/// problems are absorbed by the voice layer and only logged.
#[derive(Error, Debug)]
pub enum TrainerError {
    #[error("Word store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Voice error: {0}")]
    Voice(#[from] spellkid_voice::VoiceError),

    #[error("Session closed")]
    SessionClosed,
}
