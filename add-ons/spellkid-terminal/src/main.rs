//! SpellKid terminal trainer
//!
//! Type letters and press Enter to spell the shown word. Controls:
//! `:next`, `:prev`, `:cat <id|all>`, `:hide`, `:blur`, `:word`, `:again`,
//! `:back`, `:clear`, `:quit`. An empty line repeats the letter prompt.
//!
//! Flags: `--print-config` dumps the effective configuration as TOML;
//! `--json` prints every snapshot as a JSON line instead of text.

mod input;

use anyhow::Context;
use input::{parse_line, Input};
use spellkid_core::{
    Celebration, Collaborators, Haptics, JsonWordStore, SessionSnapshot, SharedSettings, Stage,
    TrainerConfig,
};
use spellkid_voice::{
    AudioBackend, AudioResource, DirAssets, HttpTts, PhonicsPlayer, PlaceholderTts, RodioBackend,
    SilentBackend, SpeechAnnouncer, SynthesizedSpeech, TtsBackend,
};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Rings the terminal bell.
struct BellHaptics;

impl Haptics for BellHaptics {
    fn pulse(&self, _duration: Duration) {
        let mut out = std::io::stdout();
        let _ = out.write_all(b"\x07");
        let _ = out.flush();
    }
}

struct TerminalCelebration;

impl Celebration for TerminalCelebration {
    fn trigger(&self) {
        println!("  🎉🎈 Great job! 🎈🎉");
    }

    fn clear(&self) {
        tracing::debug!("celebration cleared");
    }
}

fn render(snapshot: &SessionSnapshot) {
    match (&snapshot.stage, &snapshot.word) {
        (Stage::Empty, _) | (_, None) => println!("(no words in this category)"),
        (Stage::Completed | Stage::Advancing, Some(word)) => {
            println!("  ✔ {}", word.text.to_uppercase());
        }
        (_, Some(word)) => {
            let typed = snapshot.input.typed_prefix.to_uppercase();
            let blanks = "_".repeat(word.text.len().saturating_sub(typed.len()));
            let picture = snapshot
                .image
                .as_ref()
                .map(|i| i.path.display().to_string())
                .unwrap_or_else(|| "no picture".to_string());
            let hint = snapshot
                .input
                .expected_next_letter
                .map(|c| c.to_ascii_uppercase().to_string())
                .unwrap_or_default();
            println!(
                "[{}/{}] {}{}   next: {}   ({})",
                snapshot.position + 1,
                snapshot.deck_len,
                typed,
                blanks,
                hint,
                picture
            );
        }
    }
}

/// The part of a snapshot worth reprinting for.
fn visible(snapshot: &SessionSnapshot) -> (Stage, Option<String>, String, u64) {
    (
        snapshot.stage,
        snapshot.word.as_ref().map(|w| w.id.clone()),
        snapshot.input.typed_prefix.clone(),
        snapshot.image_key,
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before any env::var calls)
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[spellkid] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = TrainerConfig::load().context("load trainer config")?;
    if std::env::args().any(|a| a == "--print-config") {
        println!("{}", config.to_toml()?);
        return Ok(());
    }
    let json = std::env::args().any(|a| a == "--json");

    let backend: Arc<dyn AudioBackend> = match RodioBackend::new() {
        Ok(backend) => Arc::new(backend),
        Err(e) => {
            tracing::warn!(error = %e, "no audio output; continuing silently");
            Arc::new(SilentBackend::new())
        }
    };
    let audio = AudioResource::new(backend);
    let assets = Arc::new(DirAssets::new(&config.assets_root));
    let phonics = PhonicsPlayer::new(audio.clone(), assets.clone())
        .with_letter_gap(config.timing.letter_gap());

    let tts: Arc<dyn TtsBackend> = match HttpTts::from_env() {
        Ok(tts) => Arc::new(tts),
        Err(e) => {
            tracing::info!(reason = %e, "speech synthesis not configured");
            Arc::new(PlaceholderTts)
        }
    };
    let speech = Arc::new(SpeechAnnouncer::new(Arc::new(SynthesizedSpeech::new(
        tts,
        audio.clone(),
    ))));

    let store = JsonWordStore::open(&config.words_path)
        .with_context(|| format!("open word list {}", config.words_path.display()))?;

    let collaborators = Collaborators {
        store: Arc::new(store),
        phonics,
        speech,
        images: assets,
        settings: Arc::new(SharedSettings::from(&config)),
        celebration: Arc::new(TerminalCelebration),
        haptics: Arc::new(BellHaptics),
    };
    let session = spellkid_core::spawn(&config, collaborators)?;

    tracing::info!(
        words = %config.words_path.display(),
        assets = %config.assets_root.display(),
        "SpellKid started"
    );

    let mut snapshots = session.watch();
    let mut last = None;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let snapshot = snapshots.borrow_and_update().clone();
        let shown = visible(&snapshot);
        if last.as_ref() != Some(&shown) && !snapshot.render_locked {
            if json {
                println!("{}", serde_json::to_string(&snapshot)?);
            } else {
                render(&snapshot);
            }
            last = Some(shown);
        }

        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_line(&line) {
                    Input::Quit => break,
                    Input::Commands(commands) => {
                        for command in commands {
                            session.send(command)?;
                        }
                    }
                    Input::Unknown(text) => eprintln!("unknown command: {text}"),
                }
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("CTRL-C received; shutting down");
                break;
            }
        }
    }

    session.shutdown().await;
    Ok(())
}
