//! Synthesized letter tones, used when no recorded phonics asset exists.
//!
//! The pitch mapping is deliberately simple: two semitones per alphabet
//! position above A3. It is not phonetically meaningful, only distinguishable.

use std::f32::consts::TAU;
use std::time::Duration;

/// A3, the pitch of the letter `a`.
pub const BASE_FREQUENCY_HZ: f32 = 220.0;

/// Approximate semitone ratio; raised to `2 × index` per letter.
const SEMITONE_RATIO: f32 = 1.059;

const TONE_LENGTH: Duration = Duration::from_millis(200);
const GLIDE_LENGTH: Duration = Duration::from_millis(150);
const GLIDE_TARGET: f32 = 0.8;
const START_GAIN: f32 = 0.3;
const END_GAIN: f32 = 0.01;

/// Output rate for synthesized tones.
pub const TONE_SAMPLE_RATE: u32 = 44_100;

/// A short decaying tone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    /// Starting pitch in Hz.
    pub frequency: f32,
    /// Pitch reached at the end of the glide, in Hz.
    pub glide_to: f32,
    pub glide: Duration,
    pub duration: Duration,
    pub start_gain: f32,
    pub end_gain: f32,
}

impl Tone {
    /// Tone for an ASCII letter (case-insensitive). `None` for anything else.
    pub fn for_letter(letter: char) -> Option<Self> {
        let index = alphabet_index(letter)?;
        let frequency = BASE_FREQUENCY_HZ * SEMITONE_RATIO.powi(2 * index as i32);
        Some(Self {
            frequency,
            glide_to: frequency * GLIDE_TARGET,
            glide: GLIDE_LENGTH,
            duration: TONE_LENGTH,
            start_gain: START_GAIN,
            end_gain: END_GAIN,
        })
    }

    /// Exponential gain envelope at `t` seconds.
    pub fn gain_at(&self, t: f32) -> f32 {
        let length = self.duration.as_secs_f32();
        if length <= 0.0 {
            return 0.0;
        }
        let progress = (t / length).clamp(0.0, 1.0);
        self.start_gain * (self.end_gain / self.start_gain).powf(progress)
    }

    /// Exponential pitch glide at `t` seconds; holds `glide_to` once the glide ends.
    pub fn frequency_at(&self, t: f32) -> f32 {
        let glide = self.glide.as_secs_f32();
        if glide <= 0.0 {
            return self.glide_to;
        }
        let progress = (t / glide).clamp(0.0, 1.0);
        self.frequency * (self.glide_to / self.frequency).powf(progress)
    }

    /// Sample iterator for playback.
    pub fn source(&self) -> ToneSource {
        ToneSource::new(*self, TONE_SAMPLE_RATE)
    }
}

/// Zero-based position of an ASCII letter in the alphabet.
pub fn alphabet_index(letter: char) -> Option<u32> {
    let lower = letter.to_ascii_lowercase();
    lower
        .is_ascii_lowercase()
        .then(|| lower as u32 - 'a' as u32)
}

/// Mono sample stream rendering a [`Tone`].
#[derive(Debug, Clone)]
pub struct ToneSource {
    tone: Tone,
    sample_rate: u32,
    position: u64,
    total: u64,
    phase: f32,
}

impl ToneSource {
    pub fn new(tone: Tone, sample_rate: u32) -> Self {
        let total = (tone.duration.as_secs_f64() * f64::from(sample_rate)).round() as u64;
        Self {
            tone,
            sample_rate,
            position: 0,
            total,
            phase: 0.0,
        }
    }
}

impl Iterator for ToneSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.position >= self.total {
            return None;
        }
        let t = self.position as f32 / self.sample_rate as f32;
        let sample = self.phase.sin() * self.tone.gain_at(t);
        self.phase = (self.phase + TAU * self.tone.frequency_at(t) / self.sample_rate as f32) % TAU;
        self.position += 1;
        Some(sample)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.total - self.position) as usize;
        (remaining, Some(remaining))
    }
}

impl rodio::Source for ToneSource {
    fn current_frame_len(&self) -> Option<usize> {
        Some((self.total - self.position) as usize)
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(self.tone.duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letter_a_sits_on_base_frequency() {
        let tone = Tone::for_letter('a').unwrap();
        assert!((tone.frequency - BASE_FREQUENCY_HZ).abs() < f32::EPSILON);
        assert_eq!(tone.duration, Duration::from_millis(200));
    }

    #[test]
    fn pitch_rises_with_alphabet_position() {
        let pitches: Vec<f32> = ('a'..='z')
            .map(|c| Tone::for_letter(c).unwrap().frequency)
            .collect();
        assert!(pitches.windows(2).all(|w| w[1] > w[0]));
        // Two semitones per letter: `c` is four semitones above `a`.
        let c = Tone::for_letter('C').unwrap().frequency;
        assert!((c - 220.0 * 1.059f32.powi(4)).abs() < 0.01);
    }

    #[test]
    fn non_letters_have_no_tone() {
        assert!(Tone::for_letter('3').is_none());
        assert!(Tone::for_letter(' ').is_none());
        assert!(Tone::for_letter('é').is_none());
    }

    #[test]
    fn envelope_decays_from_start_to_end_gain() {
        let tone = Tone::for_letter('m').unwrap();
        assert!((tone.gain_at(0.0) - 0.3).abs() < 1e-6);
        assert!((tone.gain_at(0.2) - 0.01).abs() < 1e-6);
        assert!(tone.gain_at(0.1) < tone.gain_at(0.05));
        assert!((tone.frequency_at(1.0) - tone.glide_to).abs() < 1e-3);
    }

    #[test]
    fn source_renders_the_full_envelope() {
        let source = Tone::for_letter('b').unwrap().source();
        let samples: Vec<f32> = source.collect();
        assert_eq!(samples.len(), 8_820);
        assert!(samples.iter().all(|s| s.abs() <= 0.3 + 1e-6));
    }
}
