//! Error types for the SpellKid voice layer

use thiserror::Error;

/// Result type alias for voice operations
pub type VoiceResult<T> = Result<T, VoiceError>;

/// Errors raised by playback, assets and speech.
///
/// None of these are fatal to a learning session: the players catch them and
/// degrade to a synthesized tone or to silence.
#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("Audio device error: {0}")]
    AudioDevice(String),

    #[error("Audio playback error: {0}")]
    Playback(String),

    #[error("Asset unavailable: {0}")]
    AssetUnavailable(String),

    #[error("TTS error: {0}")]
    Tts(String),

    #[error("Speech unavailable: {0}")]
    SpeechUnavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rodio::StreamError> for VoiceError {
    fn from(err: rodio::StreamError) -> Self {
        VoiceError::AudioDevice(err.to_string())
    }
}

impl From<rodio::PlayError> for VoiceError {
    fn from(err: rodio::PlayError) -> Self {
        VoiceError::Playback(err.to_string())
    }
}

impl From<rodio::decoder::DecoderError> for VoiceError {
    fn from(err: rodio::decoder::DecoderError) -> Self {
        VoiceError::AssetUnavailable(err.to_string())
    }
}

impl From<reqwest::Error> for VoiceError {
    fn from(err: reqwest::Error) -> Self {
        VoiceError::Tts(err.to_string())
    }
}
