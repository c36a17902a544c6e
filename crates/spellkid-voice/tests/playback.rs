//! Phonics and speech sequencing against a recording backend.
//!
//! Time-sensitive tests run on tokio's paused clock.

use spellkid_voice::testing::RecordingBackend;
use spellkid_voice::{
    AudioResource, MemoryAssets, PhonicsPlayer, PlaybackOutcome, SessionSource, SpeechAnnouncer,
    SpeechEngine, SynthesizedSpeech, TtsBackend, Utterance, VoiceError, VoiceResult,
};
use std::sync::Arc;
use std::time::Duration;

fn player(backend: Arc<RecordingBackend>, assets: MemoryAssets) -> PhonicsPlayer {
    PhonicsPlayer::new(AudioResource::new(backend), Arc::new(assets))
}

async fn let_tasks_run() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn phrase_falls_back_to_letters_with_gaps() {
    let backend = Arc::new(RecordingBackend::with_auto_finish(Duration::from_millis(100)));
    let phonics = player(backend.clone(), MemoryAssets::new());

    let outcome = phonics.play_phrase("c-a b").await;

    assert_eq!(outcome, PlaybackOutcome::Finished);
    let timeline = backend.timeline();
    let labels: Vec<_> = timeline.iter().map(|(label, _)| label.as_str()).collect();
    assert_eq!(labels, vec!["tone:c", "tone:a", "tone:b"]);
    for pair in timeline.windows(2) {
        let spacing = pair[1].1 - pair[0].1;
        assert!(spacing >= Duration::from_millis(300), "spacing {spacing:?}");
        assert!(spacing < Duration::from_millis(310), "spacing {spacing:?}");
    }
}

#[tokio::test(start_paused = true)]
async fn whole_phrase_asset_wins_over_letters() {
    let backend = Arc::new(RecordingBackend::with_auto_finish(Duration::from_millis(100)));
    let assets = MemoryAssets::new().with_audio("phonics/cat.mp3", vec![1u8, 2, 3]);
    let phonics = player(backend.clone(), assets);

    assert_eq!(phonics.play_phrase("Cat").await, PlaybackOutcome::Finished);
    assert_eq!(backend.started(), vec!["phonics/cat.mp3"]);
}

#[tokio::test(start_paused = true)]
async fn undecodable_letter_asset_falls_back_to_tone() {
    let backend = Arc::new(RecordingBackend::with_auto_finish(Duration::from_millis(50)));
    let assets = MemoryAssets::new().with_audio("phonics/a.mp3", Vec::<u8>::new());
    let phonics = player(backend.clone(), assets);

    assert_eq!(phonics.play_letter('A').await, PlaybackOutcome::Finished);
    assert_eq!(backend.started(), vec!["tone:a"]);
}

#[tokio::test(start_paused = true)]
async fn stop_mid_letter_ends_the_phrase() {
    let backend = Arc::new(RecordingBackend::new());
    let phonics = player(backend.clone(), MemoryAssets::new());
    let audio = phonics.audio().clone();

    let task = tokio::spawn({
        let phonics = phonics.clone();
        async move { phonics.play_phrase("cat").await }
    });
    let_tasks_run().await;
    assert_eq!(backend.started(), vec!["tone:c"]);

    audio.stop();
    assert_eq!(task.await.unwrap(), PlaybackOutcome::Stopped);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(backend.started(), vec!["tone:c"]);
}

#[tokio::test(start_paused = true)]
async fn stop_between_letters_is_seen_at_the_checkpoint() {
    let backend = Arc::new(RecordingBackend::with_auto_finish(Duration::from_millis(100)));
    let phonics = player(backend.clone(), MemoryAssets::new());
    let audio = phonics.audio().clone();

    let task = tokio::spawn({
        let phonics = phonics.clone();
        async move { phonics.play_phrase("cat").await }
    });

    // tone:c ends at 100ms; the gap runs until 300ms.
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(!audio.is_playing());
    audio.stop();

    assert_eq!(task.await.unwrap(), PlaybackOutcome::Superseded);
    assert_eq!(backend.started(), vec!["tone:c"]);
}

#[tokio::test(start_paused = true)]
async fn prompt_issued_before_an_interruption_stays_silent() {
    let backend = Arc::new(RecordingBackend::new());
    let phonics = player(backend.clone(), MemoryAssets::new());

    let prompt = phonics.letter_prompt('t');
    phonics.audio().stop();

    assert_eq!(prompt.await, PlaybackOutcome::Superseded);
    assert!(backend.started().is_empty());
}

struct CannedTts {
    delay: Duration,
    fail: bool,
}

impl TtsBackend for CannedTts {
    fn synthesize(&self, utterance: &Utterance) -> VoiceResult<Vec<u8>> {
        std::thread::sleep(self.delay);
        if self.fail {
            return Err(VoiceError::Tts(format!("no voice for {}", utterance.text)));
        }
        Ok(utterance.text.as_bytes().to_vec())
    }
}

async fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test]
async fn synthesized_speech_plays_as_a_speech_session() {
    let backend = Arc::new(RecordingBackend::new());
    let audio = AudioResource::new(backend.clone());
    let engine = Arc::new(SynthesizedSpeech::new(
        Arc::new(CannedTts { delay: Duration::ZERO, fail: false }),
        audio.clone(),
    ));
    let announcer = SpeechAnnouncer::new(engine);

    announcer.announce("cat", Some("a small pet"));
    assert!(wait_for(|| backend.count("speech:cat for a small pet") == 1).await);
    assert_eq!(audio.current_source(), Some(SessionSource::Speech));

    announcer.cancel();
    assert!(!audio.is_playing());
}

#[tokio::test]
async fn superseded_synthesis_is_never_played() {
    let backend = Arc::new(RecordingBackend::new());
    let audio = AudioResource::new(backend.clone());
    let engine = Arc::new(SynthesizedSpeech::new(
        Arc::new(CannedTts { delay: Duration::from_millis(50), fail: false }),
        audio,
    ));
    let announcer = SpeechAnnouncer::new(engine);

    announcer.announce("cat", None);
    announcer.announce("dog", None);

    assert!(wait_for(|| backend.count("speech:dog") == 1).await);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(backend.count("speech:cat"), 0);
}

#[tokio::test]
async fn failed_synthesis_disables_speech_for_the_session() {
    let backend = Arc::new(RecordingBackend::new());
    let audio = AudioResource::new(backend.clone());
    let engine = Arc::new(SynthesizedSpeech::new(
        Arc::new(CannedTts { delay: Duration::ZERO, fail: true }),
        audio,
    ));
    let announcer = SpeechAnnouncer::new(engine.clone());

    announcer.announce("cat", None);
    assert!(wait_for(|| !engine.is_available()).await);

    announcer.announce("dog", None);
    assert!(!announcer.is_enabled());
    assert!(backend.started().is_empty());
}

#[test]
#[ignore] // Requires an audio output device
fn rodio_backend_plays_a_tone() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    runtime.block_on(async {
        let backend = spellkid_voice::RodioBackend::new().expect("output device");
        let phonics = PhonicsPlayer::new(AudioResource::new(Arc::new(backend)), Arc::new(MemoryAssets::new()));
        assert_eq!(phonics.play_letter('m').await, PlaybackOutcome::Finished);
    });
}
