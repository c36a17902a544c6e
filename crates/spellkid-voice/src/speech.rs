//! **SpeechAnnouncer** — fire-and-forget spoken word announcements.
//!
//! The announcer never blocks and never retries: the first time the speech
//! capability is missing or an utterance fails, it goes silent for the rest of
//! the session.

use crate::audio::{AudioResource, Clip, SessionSource};
use crate::error::{VoiceError, VoiceResult};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A spoken line with child-friendly prosody.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    /// Speaking rate; slightly slower than normal for clarity.
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

impl Utterance {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            rate: 0.9,
            pitch: 1.2,
            volume: 1.0,
        }
    }

    /// `"<word> for <definition>"`, or just the word. `None` when blank.
    pub fn for_word(word: &str, definition: Option<&str>) -> Option<Self> {
        let word = word.trim();
        let definition = definition.map(str::trim).filter(|d| !d.is_empty());
        let text = match (word.is_empty(), definition) {
            (true, None) => return None,
            (true, Some(definition)) => definition.to_string(),
            (false, Some(definition)) => format!("{word} for {definition}"),
            (false, None) => word.to_string(),
        };
        Some(Self::new(text))
    }
}

/// A speech capability. `speak` must only enqueue; it may not wait for audio.
pub trait SpeechEngine: Send + Sync {
    /// False when the capability is missing or has failed.
    fn is_available(&self) -> bool {
        true
    }

    fn speak(&self, utterance: Utterance) -> VoiceResult<()>;

    /// Drop any pending or audible utterance. Safe when idle.
    fn cancel(&self);
}

/// Announces words through an optional [`SpeechEngine`].
pub struct SpeechAnnouncer {
    engine: Option<Arc<dyn SpeechEngine>>,
    enabled: AtomicBool,
}

impl SpeechAnnouncer {
    pub fn new(engine: Arc<dyn SpeechEngine>) -> Self {
        Self {
            engine: Some(engine),
            enabled: AtomicBool::new(true),
        }
    }

    /// Announcer with no speech capability; the first call disables it.
    pub fn unavailable() -> Self {
        Self {
            engine: None,
            enabled: AtomicBool::new(true),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn disable(&self, reason: &str) {
        if self.enabled.swap(false, Ordering::SeqCst) {
            warn!(reason, "speech disabled for the rest of the session");
        }
    }

    /// Speak `word` (optionally "`word` for `definition`"). Returns immediately.
    pub fn announce(&self, word: &str, definition: Option<&str>) {
        if !self.is_enabled() {
            return;
        }
        let Some(engine) = self.engine.as_ref().filter(|e| e.is_available()) else {
            self.disable("speech capability unavailable");
            return;
        };
        let Some(utterance) = Utterance::for_word(word, definition) else {
            return;
        };

        engine.cancel();
        debug!(text = %utterance.text, "announcing");
        if let Err(e) = engine.speak(utterance) {
            self.disable(&e.to_string());
        }
    }

    /// Silence any pending utterance.
    pub fn cancel(&self) {
        if let Some(engine) = &self.engine {
            engine.cancel();
        }
    }
}

/// Backend that turns text into encoded audio bytes (WAV/MP3).
pub trait TtsBackend: Send + Sync {
    /// Return an empty vec to skip playback.
    fn synthesize(&self, utterance: &Utterance) -> VoiceResult<Vec<u8>>;
}

/// Placeholder TTS: returns empty audio so nothing plays.
#[derive(Debug, Default)]
pub struct PlaceholderTts;

impl TtsBackend for PlaceholderTts {
    fn synthesize(&self, _utterance: &Utterance) -> VoiceResult<Vec<u8>> {
        Ok(Vec::new())
    }
}

/// TTS over an OpenAI-compatible `/audio/speech` endpoint.
#[derive(Debug, Clone)]
pub struct HttpTts {
    /// Base URL without trailing slash (e.g. https://api.openai.com/v1).
    pub base_url: String,
    pub api_key: String,
    /// tts-1 (fast) or tts-1-hd.
    pub model: String,
    pub voice: String,
    client: reqwest::blocking::Client,
}

impl HttpTts {
    /// Build from `TTS_API_URL`, `TTS_API_KEY`, `TTS_MODEL` and `TTS_VOICE`.
    pub fn from_env() -> VoiceResult<Self> {
        let base_url = std::env::var("TTS_API_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let api_key = std::env::var("TTS_API_KEY")
            .map_err(|_| VoiceError::Config("TTS requires TTS_API_KEY".to_string()))?;
        let model = std::env::var("TTS_MODEL").unwrap_or_else(|_| "tts-1".to_string());
        let voice = std::env::var("TTS_VOICE").unwrap_or_else(|_| "shimmer".to_string());
        Self::new(base_url, api_key, model, voice)
    }

    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        voice: impl Into<String>,
    ) -> VoiceResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            voice: voice.into(),
            client,
        })
    }
}

impl TtsBackend for HttpTts {
    fn synthesize(&self, utterance: &Utterance) -> VoiceResult<Vec<u8>> {
        let text = utterance.text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/audio/speech", self.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
            "voice": self.voice,
            "speed": utterance.rate,
        });
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().unwrap_or_default();
            return Err(VoiceError::Tts(format!("TTS API error {}: {}", status, body)));
        }
        Ok(res.bytes()?.to_vec())
    }
}

/// Speech engine that synthesizes on a blocking task and plays the result
/// through the shared [`AudioResource`] as a `Speech` session.
///
/// Each `speak` takes a ticket; a synthesis that finishes after a newer
/// `speak` or a `cancel` is dropped. A failed synthesis marks the engine
/// unavailable.
pub struct SynthesizedSpeech {
    tts: Arc<dyn TtsBackend>,
    audio: AudioResource,
    ticket: Arc<AtomicU64>,
    failed: Arc<AtomicBool>,
}

impl SynthesizedSpeech {
    pub fn new(tts: Arc<dyn TtsBackend>, audio: AudioResource) -> Self {
        Self {
            tts,
            audio,
            ticket: Arc::new(AtomicU64::new(0)),
            failed: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl SpeechEngine for SynthesizedSpeech {
    fn is_available(&self) -> bool {
        !self.failed.load(Ordering::SeqCst)
    }

    fn speak(&self, utterance: Utterance) -> VoiceResult<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| VoiceError::SpeechUnavailable(e.to_string()))?;
        let ticket = self.ticket.fetch_add(1, Ordering::SeqCst) + 1;
        let tickets = Arc::clone(&self.ticket);
        let failed = Arc::clone(&self.failed);
        let tts = Arc::clone(&self.tts);
        let audio = self.audio.clone();

        runtime.spawn(async move {
            let text = utterance.text.clone();
            let synthesized = tokio::task::spawn_blocking(move || tts.synthesize(&utterance)).await;
            let bytes = match synthesized {
                Ok(Ok(bytes)) => bytes,
                Ok(Err(e)) => {
                    warn!(%text, error = %e, "speech synthesis failed");
                    failed.store(true, Ordering::SeqCst);
                    return;
                }
                Err(e) => {
                    warn!(%text, error = %e, "speech synthesis task failed");
                    failed.store(true, Ordering::SeqCst);
                    return;
                }
            };
            if tickets.load(Ordering::SeqCst) != ticket {
                debug!(%text, "stale synthesis dropped");
                return;
            }
            if bytes.is_empty() {
                return;
            }
            let outcome = audio
                .play(SessionSource::Speech, Clip::encoded(format!("speech:{text}"), bytes))
                .finished()
                .await;
            debug!(%text, ?outcome, "announcement settled");
        });
        Ok(())
    }

    fn cancel(&self) {
        self.ticket.fetch_add(1, Ordering::SeqCst);
        if self.audio.current_source() == Some(SessionSource::Speech) {
            info!("cancelling audible announcement");
            self.audio.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct ScriptedEngine {
        spoken: Mutex<Vec<String>>,
        cancels: AtomicU64,
        fail: bool,
        available: bool,
    }

    impl ScriptedEngine {
        fn working() -> Self {
            Self {
                available: true,
                ..Self::default()
            }
        }
    }

    impl SpeechEngine for ScriptedEngine {
        fn is_available(&self) -> bool {
            self.available
        }

        fn speak(&self, utterance: Utterance) -> VoiceResult<()> {
            self.spoken.lock().unwrap().push(utterance.text);
            if self.fail {
                return Err(VoiceError::Tts("voice engine crashed".into()));
            }
            Ok(())
        }

        fn cancel(&self) {
            self.cancels.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn utterance_includes_definition_when_present() {
        assert_eq!(Utterance::for_word("a", Some("apple")).unwrap().text, "a for apple");
        assert_eq!(Utterance::for_word("cat", None).unwrap().text, "cat");
        assert_eq!(Utterance::for_word("cat", Some("  ")).unwrap().text, "cat");
        assert!(Utterance::for_word("  ", None).is_none());
        let u = Utterance::new("x");
        assert_eq!((u.rate, u.pitch, u.volume), (0.9, 1.2, 1.0));
    }

    #[test]
    fn announce_cancels_before_speaking() {
        let engine = Arc::new(ScriptedEngine::working());
        let announcer = SpeechAnnouncer::new(engine.clone());
        announcer.announce("cat", None);
        announcer.announce("dog", Some("a pet"));
        assert_eq!(*engine.spoken.lock().unwrap(), vec!["cat", "dog for a pet"]);
        assert_eq!(engine.cancels.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn first_failure_disables_for_the_session() {
        let engine = Arc::new(ScriptedEngine {
            fail: true,
            ..ScriptedEngine::working()
        });
        let announcer = SpeechAnnouncer::new(engine.clone());
        announcer.announce("cat", None);
        assert!(!announcer.is_enabled());
        announcer.announce("dog", None);
        assert_eq!(engine.spoken.lock().unwrap().len(), 1);
    }

    #[test]
    fn missing_capability_goes_silent() {
        let engine = Arc::new(ScriptedEngine::default());
        let announcer = SpeechAnnouncer::new(engine.clone());
        announcer.announce("cat", None);
        assert!(!announcer.is_enabled());
        assert!(engine.spoken.lock().unwrap().is_empty());

        let none = SpeechAnnouncer::unavailable();
        none.announce("cat", None);
        assert!(!none.is_enabled());
        none.cancel();
    }

    #[test]
    fn placeholder_tts_returns_empty() {
        let out = PlaceholderTts.synthesize(&Utterance::new("hello")).unwrap();
        assert!(out.is_empty());
    }
}
