//! Publishes engine state to the shared state file.
//!
//! The exporter consumes [`TimerEvent`]s in order and rewrites the whole
//! file atomically, so a reader sees the previous record or the new one and
//! never a torn write. Failures are logged and retried on the next event;
//! they never reach the engine.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

use super::timer::TimerEvent;
use crate::config::PomodoroConfig;
use crate::fsutil::{atomic_write, remove_if_exists};
use crate::types::{epoch_seconds_now, ExportedState, TimerSnapshot};

/// Errors from writing the state file.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write state file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Writes [`ExportedState`] records for one daemon process.
#[derive(Debug)]
pub struct StateExporter {
    path: PathBuf,
    process_id: u32,
    /// Write every n-th plain tick
    tick_every: u32,
    heartbeat: Duration,
    last_snapshot: Option<TimerSnapshot>,
    ticks_since_write: u32,
    /// Last write failed; write the next event regardless of throttling
    dirty: bool,
}

impl StateExporter {
    /// Creates an exporter that writes every tick and heartbeats every 5 seconds.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            process_id: std::process::id(),
            tick_every: 1,
            heartbeat: Duration::from_secs(5),
            last_snapshot: None,
            ticks_since_write: 0,
            dirty: false,
        }
    }

    pub fn from_config(path: impl Into<PathBuf>, config: &PomodoroConfig) -> Self {
        Self::new(path)
            .with_tick_interval(config.export_tick_interval_secs)
            .with_heartbeat(config.export_heartbeat())
    }

    /// Writes plain ticks at most once per `seconds` ticks.
    pub fn with_tick_interval(mut self, seconds: u64) -> Self {
        self.tick_every = u32::try_from(seconds).unwrap_or(u32::MAX).max(1);
        self
    }

    pub fn with_heartbeat(mut self, heartbeat: Duration) -> Self {
        self.heartbeat = heartbeat.max(Duration::from_millis(1));
        self
    }

    /// Overrides the pid written into records.
    pub fn with_process_id(mut self, process_id: u32) -> Self {
        self.process_id = process_id;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes `snapshot` stamped with the current time.
    pub fn export(&mut self, snapshot: &TimerSnapshot) -> Result<(), ExportError> {
        self.last_snapshot = Some(*snapshot);

        let record = ExportedState::from_snapshot(snapshot, self.process_id, epoch_seconds_now());
        let json = serde_json::to_vec(&record)?;
        atomic_write(&self.path, &json).map_err(|source| ExportError::Io {
            path: self.path.clone(),
            source,
        })?;

        self.ticks_since_write = 0;
        Ok(())
    }

    /// Handles one state-changed signal. Returns true if the file was written.
    ///
    /// Transitions always write. Plain ticks are throttled.
    pub fn handle_event(&mut self, event: &TimerEvent) -> bool {
        if !event.is_transition() && !self.dirty {
            self.ticks_since_write += 1;
            if self.ticks_since_write < self.tick_every {
                self.last_snapshot = Some(event.snapshot);
                return false;
            }
        }
        self.write_logged(&event.snapshot)
    }

    /// Rewrites the most recent snapshot with a fresh timestamp.
    ///
    /// Keeps an idle (paused or stopped) timer from looking stale.
    pub fn heartbeat(&mut self) -> bool {
        match self.last_snapshot {
            Some(snapshot) => self.write_logged(&snapshot),
            None => false,
        }
    }

    /// Consumes events until the engine side of the channel closes, then
    /// removes the state file.
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<TimerEvent>) {
        let mut heartbeat = interval(self.heartbeat);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        heartbeat.reset();

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => {
                        if self.handle_event(&event) {
                            heartbeat.reset();
                        }
                    }
                    None => break,
                },
                _ = heartbeat.tick() => {
                    self.heartbeat();
                }
            }
        }

        debug!(path = %self.path.display(), "Engine gone, removing state file");
        self.remove();
    }

    /// Deletes the state file unless another process has taken it over.
    pub fn remove(&self) {
        if let Ok(contents) = std::fs::read(&self.path) {
            if let Ok(record) = serde_json::from_slice::<ExportedState>(&contents) {
                if record.process_id != self.process_id {
                    debug!(
                        owner = record.process_id,
                        "State file belongs to another process, leaving it"
                    );
                    return;
                }
            }
        }
        if let Err(e) = remove_if_exists(&self.path) {
            warn!(path = %self.path.display(), error = %e, "Failed to remove state file");
        }
    }

    fn write_logged(&mut self, snapshot: &TimerSnapshot) -> bool {
        match self.export(snapshot) {
            Ok(()) => {
                self.dirty = false;
                true
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to export state");
                self.dirty = true;
                false
            }
        }
    }
}
