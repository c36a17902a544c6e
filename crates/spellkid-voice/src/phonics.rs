//! **PhonicsPlayer** — letter sounds and whole-phrase phonics.
//!
//! Recorded assets are preferred; a missing or undecodable letter falls back
//! to a synthesized tone, and a missing phrase falls back to spelling it out
//! letter by letter. All sound goes through the shared [`AudioResource`].

use crate::assets::AudioAssets;
use crate::audio::{AudioResource, Clip, PlaybackOutcome, SessionSource};
use crate::tone::Tone;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default pause between letters when spelling a phrase out.
pub const DEFAULT_LETTER_GAP: Duration = Duration::from_millis(200);

/// Asset name for a single letter, e.g. `phonics/a.mp3`.
pub fn letter_asset(letter: char) -> String {
    format!("phonics/{}.mp3", letter.to_ascii_lowercase())
}

/// Asset name for a whole phrase: lowercased, runs of non-alphanumerics
/// collapsed to `_`. `None` when nothing alphanumeric remains.
pub fn phrase_asset(text: &str) -> Option<String> {
    let mut slug = String::with_capacity(text.len());
    let mut pending_separator = false;
    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('_');
            }
            pending_separator = false;
            slug.push(c);
        } else {
            pending_separator = true;
        }
    }
    (!slug.is_empty()).then(|| format!("phonics/{slug}.mp3"))
}

/// Plays phonics through the exclusive audio slot.
#[derive(Clone)]
pub struct PhonicsPlayer {
    audio: AudioResource,
    assets: Arc<dyn AudioAssets>,
    letter_gap: Duration,
}

impl PhonicsPlayer {
    pub fn new(audio: AudioResource, assets: Arc<dyn AudioAssets>) -> Self {
        Self {
            audio,
            assets,
            letter_gap: DEFAULT_LETTER_GAP,
        }
    }

    pub fn with_letter_gap(mut self, gap: Duration) -> Self {
        self.letter_gap = gap;
        self
    }

    pub fn audio(&self) -> &AudioResource {
        &self.audio
    }

    /// Play one letter: recorded asset first, synthesized tone otherwise.
    pub async fn play_letter(&self, letter: char) -> PlaybackOutcome {
        let letter = letter.to_ascii_lowercase();
        let name = letter_asset(letter);
        match self.assets.resolve_audio(&name) {
            Ok(bytes) => {
                let outcome = self
                    .audio
                    .play(SessionSource::PhonicsLetter, Clip::encoded(name, bytes))
                    .finished()
                    .await;
                if outcome != PlaybackOutcome::Unavailable {
                    return outcome;
                }
            }
            Err(e) => debug!(%letter, error = %e, "no recorded phonics; synthesizing"),
        }
        self.play_tone(letter).await
    }

    async fn play_tone(&self, letter: char) -> PlaybackOutcome {
        let Some(tone) = Tone::for_letter(letter) else {
            return PlaybackOutcome::Unavailable;
        };
        self.audio
            .play(SessionSource::PhonicsLetter, Clip::tone(format!("tone:{letter}"), tone))
            .finished()
            .await
    }

    /// Play a phrase: one recorded asset for the whole text, or each alphabetic
    /// character in turn followed by the letter gap.
    ///
    /// The letter sequence stops at the first checkpoint after anything else
    /// touched the audio slot (a new `play`, a `stop`, a word change).
    pub async fn play_phrase(&self, text: &str) -> PlaybackOutcome {
        if let Some(name) = phrase_asset(text) {
            if let Ok(bytes) = self.assets.resolve_audio(&name) {
                let outcome = self
                    .audio
                    .play(SessionSource::PhonicsPhrase, Clip::encoded(name, bytes))
                    .finished()
                    .await;
                if outcome != PlaybackOutcome::Unavailable {
                    return outcome;
                }
            }
        }

        let mut outcome = PlaybackOutcome::Unavailable;
        for letter in text.chars().filter(char::is_ascii_alphabetic) {
            outcome = self.play_letter(letter).await;
            if outcome.was_cut_short() {
                debug!(%text, %letter, "phrase interrupted mid-letter");
                return outcome;
            }
            let checkpoint = self.audio.generation();
            tokio::time::sleep(self.letter_gap).await;
            if self.audio.generation() != checkpoint {
                debug!(%text, "phrase superseded between letters");
                return PlaybackOutcome::Superseded;
            }
        }
        outcome
    }

    /// A letter prompt that can be spawned later but only sounds if nothing
    /// touched the audio slot since it was issued.
    pub fn letter_prompt(&self, letter: char) -> impl Future<Output = PlaybackOutcome> + Send + 'static {
        let player = self.clone();
        let issued_at = self.audio.generation();
        async move {
            if player.audio.generation() != issued_at {
                return PlaybackOutcome::Superseded;
            }
            player.play_letter(letter).await
        }
    }

    /// Phrase counterpart of [`PhonicsPlayer::letter_prompt`].
    pub fn phrase_prompt(&self, text: String) -> impl Future<Output = PlaybackOutcome> + Send + 'static {
        let player = self.clone();
        let issued_at = self.audio.generation();
        async move {
            if player.audio.generation() != issued_at {
                return PlaybackOutcome::Superseded;
            }
            player.play_phrase(&text).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phrase_asset_collapses_separator_runs() {
        assert_eq!(phrase_asset("Ice  Cream!").as_deref(), Some("phonics/ice_cream.mp3"));
        assert_eq!(phrase_asset("a for apple").as_deref(), Some("phonics/a_for_apple.mp3"));
        assert_eq!(phrase_asset("--cat--").as_deref(), Some("phonics/cat.mp3"));
        assert_eq!(phrase_asset("t-rex 2").as_deref(), Some("phonics/t_rex_2.mp3"));
        assert_eq!(phrase_asset(" !? "), None);
    }

    #[test]
    fn letter_asset_is_lowercased() {
        assert_eq!(letter_asset('Q'), "phonics/q.mp3");
    }
}
