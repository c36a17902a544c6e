//! rodio-backed output device.
//!
//! `rodio::OutputStream` is not `Send`, so a dedicated thread owns it and
//! receives commands over a channel. Each clip gets a fresh `Sink`; a watcher
//! thread blocks on `sleep_until_end` and reports the natural end. Halting
//! stops and drops the sink, which releases the stream handle for the next clip.

use crate::audio::{AudioBackend, Clip, ClipBody, OnEnded};
use crate::error::{VoiceError, VoiceResult};
use rodio::{OutputStream, Sink, Source};
use std::io::Cursor;
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use tracing::{debug, info, warn};

type BoxedSource = Box<dyn Source<Item = f32> + Send>;

enum Command {
    Start {
        label: String,
        source: BoxedSource,
        on_ended: OnEnded,
    },
    Halt,
}

/// Plays clips on the default output device.
pub struct RodioBackend {
    commands: Mutex<Sender<Command>>,
}

impl RodioBackend {
    /// Open the default output device on a dedicated audio thread.
    pub fn new() -> VoiceResult<Self> {
        let (commands, inbox) = mpsc::channel::<Command>();
        let (ready_tx, ready_rx) = mpsc::channel::<VoiceResult<()>>();

        thread::Builder::new()
            .name("spellkid-audio".to_string())
            .spawn(move || {
                let (_stream, handle) = match OutputStream::try_default() {
                    Ok(pair) => {
                        let _ = ready_tx.send(Ok(()));
                        pair
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.into()));
                        return;
                    }
                };
                info!("audio thread ready on default output device");

                let mut current: Option<Arc<Sink>> = None;
                for command in inbox {
                    match command {
                        Command::Start {
                            label,
                            source,
                            on_ended,
                        } => {
                            if let Some(previous) = current.take() {
                                previous.stop();
                            }
                            let sink = match Sink::try_new(&handle) {
                                Ok(sink) => Arc::new(sink),
                                Err(e) => {
                                    warn!(clip = %label, error = %e, "could not open sink");
                                    on_ended();
                                    continue;
                                }
                            };
                            sink.append(source);
                            let watched = Arc::clone(&sink);
                            let spawned = thread::Builder::new()
                                .name("spellkid-audio-watch".to_string())
                                .spawn(move || {
                                    watched.sleep_until_end();
                                    on_ended();
                                });
                            if let Err(e) = spawned {
                                warn!(clip = %label, error = %e, "could not watch sink");
                            }
                            debug!(clip = %label, "sink started");
                            current = Some(sink);
                        }
                        Command::Halt => {
                            if let Some(sink) = current.take() {
                                sink.stop();
                            }
                        }
                    }
                }
                debug!("audio thread exiting");
            })?;

        ready_rx
            .recv()
            .map_err(|_| VoiceError::AudioDevice("audio thread exited during startup".to_string()))??;

        Ok(Self {
            commands: Mutex::new(commands),
        })
    }

    fn send(&self, command: Command) -> VoiceResult<()> {
        self.commands
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .send(command)
            .map_err(|_| VoiceError::AudioDevice("audio thread is gone".to_string()))
    }
}

/// Decode (or synthesize) `clip` into a playable source.
fn decode(clip: &Clip) -> VoiceResult<BoxedSource> {
    match &clip.body {
        ClipBody::Encoded(bytes) => {
            if bytes.is_empty() {
                return Err(VoiceError::AssetUnavailable(format!("{} is empty", clip.label)));
            }
            let decoder = rodio::Decoder::new(Cursor::new(Arc::clone(bytes)))?;
            Ok(Box::new(decoder.convert_samples::<f32>()))
        }
        ClipBody::Tone(tone) => Ok(Box::new(tone.source())),
    }
}

impl AudioBackend for RodioBackend {
    fn start(&self, clip: &Clip, on_ended: OnEnded) -> VoiceResult<()> {
        let source = decode(clip)?;
        self.send(Command::Start {
            label: clip.label.clone(),
            source,
            on_ended,
        })
    }

    fn halt(&self) {
        if let Err(e) = self.send(Command::Halt) {
            debug!(error = %e, "halt ignored");
        }
    }
}
