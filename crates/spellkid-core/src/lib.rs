//! # SpellKid Core - spelling trainer state machine
//!
//! A child sees a picture and types the word on a keyboard. Each accepted
//! letter is sounded out, a pause brings back a reminder of the letter that is
//! expected, and a finished word is celebrated before the next one appears.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       Session actor                          │
//! │  Command ──→ ┌──────────────────────────┐ ──→ SessionSnapshot│
//! │              │    WordProgression       │ ──→ SessionEvent   │
//! │  TimerFired →│ validator · deck · guard │                    │
//! │              └──────────────────────────┘                    │
//! │       reminder / settle / advance / debounce / race lock     │
//! │                        ↓                                     │
//! │          PhonicsPlayer · SpeechAnnouncer (spellkid-voice)     │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod guard;
pub mod ports;
pub mod progression;
pub mod reminder;
pub mod session;
pub mod timer;
pub mod validator;
pub mod words;

pub use config::{DisplayOrder, TimingConfig, TrainerConfig, DEFAULT_CONFIG_PATH};
pub use error::{TrainerError, TrainerResult};
pub use guard::{CategoryGate, Interruption, InterruptionGuard};
pub use ports::{
    Celebration, Haptics, ImageHandle, ImageResolver, Settings, SharedSettings,
    TracingCelebration, TracingHaptics,
};
pub use progression::{
    Collaborators, Command, SessionEvent, SessionEventKind, SessionSnapshot, Stage,
    WordProgression,
};
pub use reminder::{IdleReminderScheduler, ReminderState};
pub use session::{spawn, SessionHandle};
pub use timer::{TimerFired, TimerHandle, TimerId, TimerKind, TimerSlot};
pub use validator::{validate, InputState, Verdict};
pub use words::{Category, CategoryFilter, JsonWordStore, MemoryWordStore, Word, WordDeck, WordStore};
