//! **InputValidator** — decides whether a candidate buffer is progress.

use serde::Serialize;

/// Result of checking a candidate buffer against the target word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The candidate is a strict prefix; `next` is the letter to type now.
    Accepted { prefix: String, next: char },
    /// The candidate spells the whole word.
    Completed { text: String },
    /// Not a prefix; the buffer stays as it was.
    Rejected,
}

/// Check `candidate` against `target`, case-insensitively.
pub fn validate(target: &str, candidate: &str) -> Verdict {
    let target = target.to_lowercase();
    let candidate = candidate.to_lowercase();
    if !target.starts_with(&candidate) {
        return Verdict::Rejected;
    }
    match target[candidate.len()..].chars().next() {
        Some(next) => Verdict::Accepted {
            prefix: candidate,
            next,
        },
        None => Verdict::Completed { text: candidate },
    }
}

/// Typing progress on the active word.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InputState {
    pub typed_prefix: String,
    pub expected_next_letter: Option<char>,
    pub completed: bool,
}

impl InputState {
    /// Fresh state for `target`: nothing typed, first letter expected.
    pub fn fresh(target: &str) -> Self {
        let expected_next_letter = target.chars().next().map(|c| c.to_ascii_lowercase());
        Self {
            typed_prefix: String::new(),
            completed: expected_next_letter.is_none(),
            expected_next_letter,
        }
    }

    /// Apply a verdict. Returns false (and leaves the state alone) on rejection.
    pub fn apply(&mut self, verdict: &Verdict) -> bool {
        match verdict {
            Verdict::Accepted { prefix, next } => {
                self.typed_prefix = prefix.clone();
                self.expected_next_letter = Some(*next);
                self.completed = false;
                true
            }
            Verdict::Completed { text } => {
                self.typed_prefix = text.clone();
                self.expected_next_letter = None;
                self.completed = true;
                true
            }
            Verdict::Rejected => false,
        }
    }
}
