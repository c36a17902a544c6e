//! **WordProgressionController** — the trainer's state machine.
//!
//! ```text
//! Loading → Presenting(word) → AwaitingInput → Completed → Advancing → Presenting(next)
//!              ↑                     │ Next/Previous/category commit
//!              └─────────────────────┘
//! ```
//!
//! All mutation happens on one task. Timers are spawned tasks that report back
//! through the receiver returned by [`WordProgression::new`]; audio prompts are
//! spawned futures guarded by the audio generation at the time they were issued.

use crate::config::{TimingConfig, TrainerConfig};
use crate::error::TrainerResult;
use crate::guard::{CategoryGate, Interruption, InterruptionGuard};
use crate::ports::{Celebration, Haptics, ImageHandle, ImageResolver, Settings};
use crate::reminder::IdleReminderScheduler;
use crate::timer::{TimerFired, TimerKind, TimerSlot};
use crate::validator::{validate, InputState, Verdict};
use crate::words::{Category, CategoryFilter, Word, WordDeck, WordStore};
use chrono::{DateTime, Utc};
use serde::Serialize;
use spellkid_voice::{PhonicsPlayer, SpeechAnnouncer};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Loading,
    /// The filtered deck has no words.
    Empty,
    Presenting,
    AwaitingInput,
    Completed,
    Advancing,
}

/// What the learner (or the page around them) did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Type one letter.
    Key(char),
    Backspace,
    Clear,
    /// Submit a whole buffer, as a text field would.
    Replace(String),
    Next,
    Previous,
    SelectCategory(CategoryFilter),
    PageHidden,
    WindowBlur,
    /// Play the whole active word.
    HearWord,
    /// Replay the expected letter now.
    RepeatPrompt,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEventKind {
    WordPresented { word_id: String, text: String },
    LetterAccepted { prefix: String, next: char },
    InputRejected { candidate: String },
    WordCompleted { word_id: String, celebrated: bool },
    Advanced { from: String },
    Interrupted { cause: Interruption },
    CategoryApplied { filter: CategoryFilter, words: usize },
}

/// A timestamped session notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionEvent {
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: SessionEventKind,
}

/// Observable state, published after every step.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub stage: Stage,
    pub word: Option<Word>,
    pub input: InputState,
    pub filter: CategoryFilter,
    pub pending_filter: Option<CategoryFilter>,
    /// Rendering is held back while a category change settles.
    pub render_locked: bool,
    pub image: Option<ImageHandle>,
    /// Bumped once per presented word.
    pub image_key: u64,
    pub position: usize,
    pub deck_len: usize,
    pub reminder_armed: bool,
    pub advance_armed: bool,
    /// The page is hidden or unfocused; nothing is prompted until the learner is back.
    pub suspended: bool,
    pub celebrations: u64,
    pub categories: Vec<Category>,
}

/// Everything the controller talks to.
pub struct Collaborators {
    pub store: Arc<dyn WordStore>,
    pub phonics: PhonicsPlayer,
    pub speech: Arc<SpeechAnnouncer>,
    pub images: Arc<dyn ImageResolver>,
    pub settings: Arc<dyn Settings>,
    pub celebration: Arc<dyn Celebration>,
    pub haptics: Arc<dyn Haptics>,
}

pub struct WordProgression {
    timing: TimingConfig,
    announce_on_complete: bool,
    store: Arc<dyn WordStore>,
    phonics: PhonicsPlayer,
    speech: Arc<SpeechAnnouncer>,
    images: Arc<dyn ImageResolver>,
    settings: Arc<dyn Settings>,
    celebration: Arc<dyn Celebration>,
    haptics: Arc<dyn Haptics>,
    guard: InterruptionGuard,

    deck: WordDeck,
    categories: Vec<Category>,
    stage: Stage,
    word: Option<Word>,
    input: InputState,
    image: Option<ImageHandle>,
    /// Per-presentation token; doubles as the image key.
    presentation: u64,
    /// (word id, presentation) that already celebrated.
    celebrated: Option<(String, u64)>,
    celebrations: u64,
    /// Set by PageHidden/WindowBlur, cleared by the next learner command.
    suspended: bool,

    reminder: IdleReminderScheduler,
    settle: TimerSlot,
    advance: TimerSlot,
    gate: CategoryGate,
    events: broadcast::Sender<SessionEvent>,
}

impl WordProgression {
    /// Create a controller and the receiver its timers report to.
    pub fn new(
        config: &TrainerConfig,
        collaborators: Collaborators,
    ) -> (Self, mpsc::UnboundedReceiver<TimerFired>) {
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(64);
        let timing = config.timing.clone();
        let Collaborators {
            store,
            phonics,
            speech,
            images,
            settings,
            celebration,
            haptics,
        } = collaborators;
        let guard = InterruptionGuard::new(
            phonics.audio().clone(),
            Arc::clone(&speech),
            Arc::clone(&celebration),
        );

        let progression = Self {
            reminder: IdleReminderScheduler::new(timing.reminder_interval(), timer_tx.clone()),
            settle: TimerSlot::new(TimerKind::Settle, timer_tx.clone()),
            advance: TimerSlot::new(TimerKind::Advance, timer_tx.clone()),
            gate: CategoryGate::new(timing.category_debounce(), timing.race_lock(), timer_tx),
            timing,
            announce_on_complete: config.announce_on_complete,
            store,
            phonics,
            speech,
            images,
            settings,
            celebration,
            haptics,
            guard,
            deck: WordDeck::default(),
            categories: Vec::new(),
            stage: Stage::Loading,
            word: None,
            input: InputState::default(),
            image: None,
            presentation: 0,
            celebrated: None,
            celebrations: 0,
            suspended: false,
            events,
        };
        (progression, timer_rx)
    }

    /// Load the word lists and present the first word.
    pub fn start(&mut self) -> TrainerResult<()> {
        let words = self.store.list_words()?;
        let categories = self.store.list_categories()?;
        info!(words = words.len(), categories = categories.len(), "session loaded");
        self.deck = WordDeck::new(words, self.settings.image_display_order());
        self.categories = categories;
        self.present_current();
        Ok(())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn events_sender(&self) -> broadcast::Sender<SessionEvent> {
        self.events.clone()
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            stage: self.stage,
            word: self.word.clone(),
            input: self.input.clone(),
            filter: self.deck.filter().clone(),
            pending_filter: self.gate.pending().cloned(),
            render_locked: self.gate.is_locked(),
            image: self.image.clone(),
            image_key: self.presentation,
            position: self.deck.index(),
            deck_len: self.deck.len(),
            reminder_armed: self.reminder.is_armed(),
            advance_armed: self.advance.is_live(),
            suspended: self.suspended,
            celebrations: self.celebrations,
            categories: self.categories.clone(),
        }
    }

    fn emit(&self, kind: SessionEventKind) {
        // No subscribers is fine.
        let _ = self.events.send(SessionEvent {
            at: Utc::now(),
            kind,
        });
    }

    fn prompt_letter(&self, letter: char) {
        tokio::spawn(self.phonics.letter_prompt(letter));
    }

    pub fn handle(&mut self, command: Command) {
        debug!(?command, stage = ?self.stage, "command");
        if !matches!(command, Command::PageHidden | Command::WindowBlur) {
            self.resume();
        }
        match command {
            Command::Key(letter) => {
                let candidate = format!("{}{}", self.input.typed_prefix, letter);
                self.submit(&candidate);
            }
            Command::Backspace => {
                let mut candidate = self.input.typed_prefix.clone();
                if candidate.pop().is_some() {
                    self.submit(&candidate);
                }
            }
            Command::Clear => self.submit(""),
            Command::Replace(buffer) => self.submit(&buffer),
            Command::Next => {
                if self.deck.next_word().is_some() {
                    self.present_current();
                }
            }
            Command::Previous => {
                if self.deck.previous_word().is_some() {
                    self.present_current();
                }
            }
            Command::SelectCategory(filter) => {
                self.gate.select(filter);
            }
            Command::PageHidden => self.interrupt(Interruption::PageHidden),
            Command::WindowBlur => self.interrupt(Interruption::WindowBlur),
            Command::HearWord => {
                if let Some(word) = &self.word {
                    tokio::spawn(self.phonics.phrase_prompt(word.text.clone()));
                }
            }
            Command::RepeatPrompt => {
                if self.stage == Stage::AwaitingInput {
                    if let Some(letter) = self.input.expected_next_letter {
                        self.prompt_letter(letter);
                    }
                }
            }
        }
    }

    pub fn on_timer(&mut self, fired: TimerFired) {
        match fired.kind {
            TimerKind::Reminder => {
                if !self.reminder.on_fire(fired.id) || self.stage != Stage::AwaitingInput {
                    return;
                }
                // Read at fire time, not when the reminder was armed.
                if let Some(letter) = self.input.expected_next_letter {
                    debug!(%letter, state = ?self.reminder.state(), "idle reminder");
                    self.prompt_letter(letter);
                }
            }
            TimerKind::Settle => {
                if !self.settle.take_fire(fired.id) || self.stage != Stage::AwaitingInput {
                    return;
                }
                if let Some(letter) = self.input.expected_next_letter {
                    self.phonics.audio().stop();
                    self.prompt_letter(letter);
                    self.reminder.arm(self.timing.reminder_interval());
                }
            }
            TimerKind::Advance => {
                if !self.advance.take_fire(fired.id) {
                    return;
                }
                let from = self.word.as_ref().map(|w| w.id.clone()).unwrap_or_default();
                self.emit(SessionEventKind::Advanced { from });
                if self.deck.next_word().is_some() {
                    self.present_current();
                }
            }
            TimerKind::CategoryDebounce => {
                if let Some(filter) = self.gate.on_debounce(fired.id, self.deck.filter()) {
                    self.apply_category(filter);
                }
            }
            TimerKind::RaceLock => {
                if self.gate.on_race_lock(fired.id) {
                    debug!("race lock released");
                }
            }
        }
    }

    fn interrupt(&mut self, cause: Interruption) {
        self.guard.collapse(cause, &mut self.reminder, &mut self.settle);
        if cause != Interruption::CategoryChange {
            self.suspended = true;
        }
        self.emit(SessionEventKind::Interrupted { cause });
    }

    /// The learner is back. A word presented while away never armed its
    /// reminder, so arm it now.
    fn resume(&mut self) {
        if !std::mem::take(&mut self.suspended) {
            return;
        }
        debug!(stage = ?self.stage, "resumed after interruption");
        if self.stage == Stage::AwaitingInput && !self.reminder.is_armed() {
            self.reminder.arm(self.timing.first_reminder());
        }
    }

    fn apply_category(&mut self, filter: CategoryFilter) {
        self.interrupt(Interruption::CategoryChange);
        self.deck.apply(filter.clone(), self.settings.image_display_order());
        info!(?filter, words = self.deck.len(), "category applied");
        self.emit(SessionEventKind::CategoryApplied {
            filter,
            words: self.deck.len(),
        });
        self.present_current();
    }

    /// Make the deck's current word active, resetting everything tied to the
    /// previous one.
    fn present_current(&mut self) {
        self.reminder.disarm();
        self.settle.cancel();
        self.advance.cancel();
        self.celebrated = None;
        self.speech.cancel();
        self.phonics.audio().stop();

        let Some(word) = self.deck.current().cloned() else {
            warn!(filter = ?self.deck.filter(), "no words to present");
            self.word = None;
            self.input = InputState::default();
            self.image = None;
            self.stage = Stage::Empty;
            return;
        };

        self.stage = Stage::Presenting;
        self.presentation += 1;
        self.input = InputState::fresh(&word.text);
        self.image = self.images.resolve_image(&word.image_ref);
        if self.image.is_none() && !word.image_ref.is_empty() {
            debug!(image = %word.image_ref, "image unavailable; presenting without it");
        }
        info!(word = %word.text, id = %word.id, key = self.presentation, "presenting word");
        self.emit(SessionEventKind::WordPresented {
            word_id: word.id.clone(),
            text: word.text.clone(),
        });

        if self.suspended {
            debug!(word = %word.text, "presented while away; prompt deferred");
        } else {
            if let Some(letter) = self.input.expected_next_letter {
                self.prompt_letter(letter);
            }
            self.reminder.arm(self.timing.first_reminder());
        }
        self.word = Some(word);
        self.stage = Stage::AwaitingInput;
    }

    fn submit(&mut self, candidate: &str) {
        if self.stage != Stage::AwaitingInput {
            debug!(stage = ?self.stage, "input ignored until the next word");
            return;
        }
        let Some(word) = &self.word else {
            return;
        };

        let verdict = validate(&word.text, candidate);
        match &verdict {
            Verdict::Rejected => {
                debug!(%candidate, "keystroke rejected");
                self.emit(SessionEventKind::InputRejected {
                    candidate: candidate.to_string(),
                });
            }
            Verdict::Accepted { prefix, next } => {
                self.input.apply(&verdict);
                self.reminder.disarm();
                self.reminder.arm(self.timing.reminder_interval());
                self.settle.arm(self.timing.settle());
                self.emit(SessionEventKind::LetterAccepted {
                    prefix: prefix.clone(),
                    next: *next,
                });
            }
            Verdict::Completed { .. } => {
                self.input.apply(&verdict);
                self.finish_word();
            }
        }
    }

    fn finish_word(&mut self) {
        let Some(word) = self.word.clone() else {
            return;
        };
        let token = (word.id.clone(), self.presentation);
        if self.celebrated.as_ref() == Some(&token) {
            debug!(word = %word.text, "already completed");
            return;
        }
        self.celebrated = Some(token);

        self.stage = Stage::Completed;
        self.phonics.audio().stop();
        self.reminder.disarm();
        self.settle.cancel();
        self.haptics.pulse(self.timing.haptic_pulse());

        let celebrate = self.settings.celebration_enabled();
        if celebrate {
            self.celebration.trigger();
            self.celebrations += 1;
        }
        if self.announce_on_complete {
            self.speech.announce(&word.text, word.definition.as_deref());
        }
        info!(word = %word.text, celebrate, "word completed");
        self.emit(SessionEventKind::WordCompleted {
            word_id: word.id.clone(),
            celebrated: celebrate,
        });

        self.advance.arm(self.timing.advance(celebrate));
        self.stage = Stage::Advancing;
    }

    /// Silence everything and drop every timer.
    pub fn shutdown(&mut self) {
        self.phonics.audio().stop();
        self.speech.cancel();
        self.reminder.disarm();
        self.settle.cancel();
        self.advance.cancel();
        self.gate.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{SharedSettings, TracingCelebration};
    use crate::words::MemoryWordStore;
    use spellkid_voice::testing::RecordingBackend;
    use spellkid_voice::{AudioResource, MemoryAssets};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct CountingHaptics(AtomicUsize);

    impl Haptics for CountingHaptics {
        fn pulse(&self, _duration: Duration) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn progression(words: Vec<Word>) -> (WordProgression, Arc<TracingCelebration>) {
        let (progression, celebration, _) = progression_with_haptics(words);
        (progression, celebration)
    }

    fn progression_with_haptics(
        words: Vec<Word>,
    ) -> (WordProgression, Arc<TracingCelebration>, Arc<CountingHaptics>) {
        let celebration = Arc::new(TracingCelebration::default());
        let haptics = Arc::new(CountingHaptics::default());
        let audio = AudioResource::new(Arc::new(RecordingBackend::new()));
        let collaborators = Collaborators {
            store: Arc::new(MemoryWordStore::new(words, Vec::new())),
            phonics: PhonicsPlayer::new(audio, Arc::new(MemoryAssets::new())),
            speech: Arc::new(SpeechAnnouncer::unavailable()),
            images: Arc::new(MemoryAssets::new()),
            settings: Arc::new(SharedSettings::new(true, Default::default())),
            celebration: celebration.clone(),
            haptics: haptics.clone(),
        };
        let (progression, _timers) = WordProgression::new(&TrainerConfig::default(), collaborators);
        (progression, celebration, haptics)
    }

    #[tokio::test]
    async fn completing_twice_celebrates_once() {
        let (mut p, celebration, haptics) = progression_with_haptics(vec![Word::new("w1", "cat")]);
        p.start().unwrap();
        p.handle(Command::Replace("cat".into()));
        assert_eq!(p.stage(), Stage::Advancing);
        assert_eq!(haptics.0.load(Ordering::SeqCst), 1);

        p.finish_word();
        assert_eq!(p.stage(), Stage::Advancing);
        assert!(p.snapshot().advance_armed);
        assert_eq!(celebration.triggered(), 1);
        assert_eq!(haptics.0.load(Ordering::SeqCst), 1);
        assert_eq!(p.snapshot().celebrations, 1);
    }

    #[tokio::test]
    async fn word_presented_while_hidden_waits_for_the_learner() {
        let (mut p, _) = progression(vec![Word::new("w1", "cat"), Word::new("w2", "dog")]);
        p.start().unwrap();
        p.handle(Command::WindowBlur);
        p.handle(Command::Next);
        // Next is a learner command, so it resumes before presenting.
        assert!(!p.snapshot().suspended);
        assert!(p.snapshot().reminder_armed);

        p.handle(Command::PageHidden);
        p.present_current();
        let snapshot = p.snapshot();
        assert!(snapshot.suspended);
        assert_eq!(snapshot.stage, Stage::AwaitingInput);
        assert!(!snapshot.reminder_armed);

        p.handle(Command::RepeatPrompt);
        let snapshot = p.snapshot();
        assert!(!snapshot.suspended);
        assert!(snapshot.reminder_armed);
    }

    #[tokio::test]
    async fn input_is_frozen_after_completion() {
        let (mut p, _) = progression(vec![Word::new("w1", "cat"), Word::new("w2", "dog")]);
        p.start().unwrap();
        p.handle(Command::Replace("cat".into()));
        p.handle(Command::Backspace);
        p.handle(Command::Clear);

        let snapshot = p.snapshot();
        assert_eq!(snapshot.stage, Stage::Advancing);
        assert!(snapshot.input.completed);
        assert_eq!(snapshot.input.typed_prefix, "cat");
        assert!(snapshot.advance_armed);
    }

    #[tokio::test]
    async fn presenting_the_same_word_again_allows_a_new_celebration() {
        let (mut p, celebration) = progression(vec![Word::new("solo", "hi")]);
        p.start().unwrap();
        p.handle(Command::Replace("hi".into()));
        p.handle(Command::Next);
        assert_eq!(p.stage(), Stage::AwaitingInput);
        p.handle(Command::Replace("hi".into()));
        assert_eq!(celebration.triggered(), 2);
        assert_eq!(p.snapshot().image_key, 2);
    }

    #[tokio::test]
    async fn empty_deck_is_its_own_stage() {
        let (mut p, _) = progression(Vec::new());
        p.start().unwrap();
        assert_eq!(p.stage(), Stage::Empty);
        p.handle(Command::Key('a'));
        p.handle(Command::Next);
        let snapshot = p.snapshot();
        assert_eq!(snapshot.stage, Stage::Empty);
        assert!(snapshot.word.is_none());
        assert!(!snapshot.reminder_armed);
    }

    #[tokio::test]
    async fn backspace_steps_back_one_letter() {
        let (mut p, _) = progression(vec![Word::new("w1", "cat")]);
        p.start().unwrap();
        p.handle(Command::Key('c'));
        p.handle(Command::Key('a'));
        p.handle(Command::Backspace);
        assert_eq!(p.snapshot().input.typed_prefix, "c");
        assert_eq!(p.snapshot().input.expected_next_letter, Some('a'));
    }
}
