//! Reader side of the state file protocol.
//!
//! A status bar polls the state file on its own schedule and decides how
//! far to trust it:
//! - `Live`: valid record, owning process alive, written within the window
//! - `Stale`: valid record from a live process, but too old
//! - `Disconnected`: missing, unreadable, malformed, or written by a dead process
//!
//! Only `Live` data may be shown as the current timer. Reading never
//! modifies the file.

pub mod render;

use std::io;
use std::path::Path;
use std::time::Duration;

use sysinfo::{Pid, ProcessesToUpdate, System};
use thiserror::Error;
use tracing::debug;

use crate::types::{epoch_seconds_now, ExportedState};

pub use render::{StatusFormat, StatusLine};

// ============================================================================
// SourceState
// ============================================================================

/// Why a state file cannot be trusted at all.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DisconnectReason {
    #[error("state file not found")]
    Missing,

    #[error("state file is invalid: {0}")]
    Invalid(String),

    #[error("timer process {0} is not running")]
    ProcessGone(u32),
}

/// Trust level of the exported state.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceState {
    Live(ExportedState),
    Stale(ExportedState),
    Disconnected(DisconnectReason),
}

impl SourceState {
    pub fn is_live(&self) -> bool {
        matches!(self, SourceState::Live(_))
    }

    /// The record if it may be displayed as current state.
    pub fn live_record(&self) -> Option<&ExportedState> {
        match self {
            SourceState::Live(record) => Some(record),
            _ => None,
        }
    }

    /// Short label used in logs and the json status class.
    pub fn label(&self) -> &'static str {
        match self {
            SourceState::Live(_) => "live",
            SourceState::Stale(_) => "stale",
            SourceState::Disconnected(_) => "disconnected",
        }
    }
}

// ============================================================================
// LivenessCheck
// ============================================================================

/// Answers whether a pid belongs to a running process.
pub trait LivenessCheck {
    fn is_alive(&self, pid: u32) -> bool;
}

/// Looks the pid up in the OS process table.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLivenessCheck;

impl LivenessCheck for SystemLivenessCheck {
    fn is_alive(&self, pid: u32) -> bool {
        if pid == 0 {
            return false;
        }
        let pid = Pid::from_u32(pid);
        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]));
        system.process(pid).is_some()
    }
}

/// Liveness check with a fixed answer, for tests and offline rendering.
#[derive(Debug, Clone, Copy)]
pub struct AssumeAlive(pub bool);

impl LivenessCheck for AssumeAlive {
    fn is_alive(&self, _pid: u32) -> bool {
        self.0
    }
}

// ============================================================================
// Classification
// ============================================================================

/// Parses a state file body. Every field is required.
pub fn parse_record(contents: &[u8]) -> Result<ExportedState, DisconnectReason> {
    let record: ExportedState =
        serde_json::from_slice(contents).map_err(|e| DisconnectReason::Invalid(e.to_string()))?;

    if record.phase().is_none() {
        return Err(DisconnectReason::Invalid(format!(
            "unknown phase '{}'",
            record.phase
        )));
    }
    if record.time_remaining_seconds > record.total_duration_seconds {
        return Err(DisconnectReason::Invalid(
            "remaining time exceeds phase duration".to_string(),
        ));
    }
    if !record.updated_at_epoch_seconds.is_finite() || !record.progress_percent.is_finite() {
        return Err(DisconnectReason::Invalid("non-finite number".to_string()));
    }
    Ok(record)
}

/// Classifies a parsed record against `now`.
///
/// A dead writer wins over age. Records from the future beyond the window
/// are treated like old ones, since the clock cannot be trusted either way.
pub fn classify(
    record: ExportedState,
    window: Duration,
    now_epoch_seconds: f64,
    liveness: &dyn LivenessCheck,
) -> SourceState {
    if !liveness.is_alive(record.process_id) {
        return SourceState::Disconnected(DisconnectReason::ProcessGone(record.process_id));
    }
    if record.age_seconds(now_epoch_seconds).abs() > window.as_secs_f64() {
        return SourceState::Stale(record);
    }
    SourceState::Live(record)
}

/// Reads and classifies the state file at `path`.
pub fn read_source(
    path: &Path,
    window: Duration,
    now_epoch_seconds: f64,
    liveness: &dyn LivenessCheck,
) -> SourceState {
    let contents = match std::fs::read(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return SourceState::Disconnected(DisconnectReason::Missing);
        }
        Err(e) => return SourceState::Disconnected(DisconnectReason::Invalid(e.to_string())),
    };

    let state = match parse_record(&contents) {
        Ok(record) => classify(record, window, now_epoch_seconds, liveness),
        Err(reason) => SourceState::Disconnected(reason),
    };
    debug!(path = %path.display(), state = state.label(), "Read state file");
    state
}

/// [`read_source`] against the wall clock and the OS process table.
pub fn read_source_now(path: &Path, window: Duration) -> SourceState {
    read_source(path, window, epoch_seconds_now(), &SystemLivenessCheck)
}

// ============================================================================
// Tests
// ============================================================================
