//! # SpellKid Voice - exclusive audio for the spelling trainer
//!
//! Everything the learner hears goes through one [`AudioResource`]: starting a
//! clip stops the previous one first, and every completion carries the
//! generation it was issued under so late callbacks are dropped.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │  PhonicsPlayer ──┐                                        │
//! │  (asset → tone)  │    ┌───────────────┐   ┌────────────┐  │
//! │                  ├──→ │ AudioResource │──→│  Backend   │  │
//! │  SpeechAnnouncer │    │ (generation)  │   │ rodio/none │  │
//! │  (TTS, kill sw.) ┘    └───────────────┘   └────────────┘  │
//! └───────────────────────────────────────────────────────────┘
//! ```

pub mod assets;
pub mod audio;
pub mod error;
pub mod output;
pub mod phonics;
pub mod speech;
pub mod testing;
pub mod tone;

pub use assets::{AudioAssets, DirAssets, MemoryAssets};
pub use audio::{
    AudioBackend, AudioResource, Clip, ClipBody, OnEnded, Playback, PlaybackOutcome,
    SessionSource, SilentBackend,
};
pub use error::{VoiceError, VoiceResult};
pub use output::RodioBackend;
pub use phonics::{letter_asset, phrase_asset, PhonicsPlayer, DEFAULT_LETTER_GAP};
pub use speech::{
    HttpTts, PlaceholderTts, SpeechAnnouncer, SpeechEngine, SynthesizedSpeech, TtsBackend,
    Utterance,
};
pub use tone::{Tone, ToneSource};
