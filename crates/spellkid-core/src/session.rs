//! The session actor: one task owns the [`WordProgression`] and consumes
//! commands and timer fires in arrival order.

use crate::config::TrainerConfig;
use crate::error::{TrainerError, TrainerResult};
use crate::progression::{Collaborators, Command, SessionEvent, SessionSnapshot, WordProgression};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Client side of a running session.
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<SessionSnapshot>,
    events: broadcast::Sender<SessionEvent>,
    task: JoinHandle<()>,
}

/// Load the words, present the first one and start the actor.
///
/// Must be called from within a tokio runtime.
pub fn spawn(config: &TrainerConfig, collaborators: Collaborators) -> TrainerResult<SessionHandle> {
    let (mut progression, mut timers) = WordProgression::new(config, collaborators);
    let events = progression.events_sender();
    progression.start()?;

    let (snapshot_tx, snapshots) = watch::channel(progression.snapshot());
    let (commands, mut inbox) = mpsc::unbounded_channel::<Command>();

    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                command = inbox.recv() => match command {
                    Some(command) => progression.handle(command),
                    None => break,
                },
                Some(fired) = timers.recv() => progression.on_timer(fired),
            }
            snapshot_tx.send_replace(progression.snapshot());
        }
        progression.shutdown();
        snapshot_tx.send_replace(progression.snapshot());
        info!("session stopped");
    });

    Ok(SessionHandle {
        commands,
        snapshots,
        events,
        task,
    })
}

impl SessionHandle {
    pub fn send(&self, command: Command) -> TrainerResult<()> {
        self.commands
            .send(command)
            .map_err(|_| TrainerError::SessionClosed)
    }

    /// Latest published state.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver that wakes on every published snapshot.
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Stop the actor, silencing audio and dropping every timer.
    pub async fn shutdown(self) {
        drop(self.commands);
        if let Err(e) = self.task.await {
            debug!(error = %e, "session task ended abnormally");
        }
    }
}
