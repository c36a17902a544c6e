//! Maps typed lines to session commands.

use spellkid_core::{CategoryFilter, Command};

#[derive(Debug, PartialEq, Eq)]
pub enum Input {
    Commands(Vec<Command>),
    Quit,
    Unknown(String),
}

/// Letters become keystrokes; `:`-prefixed words are controls. An empty line
/// repeats the prompt.
pub fn parse_line(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Commands(vec![Command::RepeatPrompt]);
    }
    let Some(control) = line.strip_prefix(':') else {
        let keys = line
            .chars()
            .filter(char::is_ascii_alphabetic)
            .map(|c| Command::Key(c.to_ascii_lowercase()))
            .collect();
        return Input::Commands(keys);
    };

    let mut parts = control.split_whitespace();
    let command = match (parts.next().unwrap_or_default(), parts.next()) {
        ("q" | "quit", _) => return Input::Quit,
        ("n" | "next", _) => Command::Next,
        ("p" | "prev", _) => Command::Previous,
        ("cat", selection) => Command::SelectCategory(CategoryFilter::parse(selection.unwrap_or("all"))),
        ("hide", _) => Command::PageHidden,
        ("blur", _) => Command::WindowBlur,
        ("word", _) => Command::HearWord,
        ("again", _) => Command::RepeatPrompt,
        ("back", _) => Command::Backspace,
        ("clear", _) => Command::Clear,
        _ => return Input::Unknown(line.to_string()),
    };
    Input::Commands(vec![command])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_become_keystrokes() {
        assert_eq!(
            parse_line("Ca t"),
            Input::Commands(vec![Command::Key('c'), Command::Key('a'), Command::Key('t')])
        );
    }

    #[test]
    fn controls_are_recognised() {
        assert_eq!(parse_line(":next"), Input::Commands(vec![Command::Next]));
        assert_eq!(
            parse_line(":cat animals"),
            Input::Commands(vec![Command::SelectCategory(CategoryFilter::Only("animals".into()))])
        );
        assert_eq!(
            parse_line(":cat"),
            Input::Commands(vec![Command::SelectCategory(CategoryFilter::All)])
        );
        assert_eq!(parse_line(":quit"), Input::Quit);
        assert_eq!(parse_line(":dance"), Input::Unknown(":dance".into()));
        assert_eq!(parse_line("  "), Input::Commands(vec![Command::RepeatPrompt]));
    }
}
