//! The exported state record shared with external readers.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::{Phase, TimerSnapshot};

/// Latest timer state as written to the state file.
///
/// Every field is required on read: a record missing any of them does not
/// deserialize, and readers treat it as a disconnected source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedState {
    /// Pid of the writing daemon
    pub process_id: u32,
    /// Phase label, see [`Phase::as_str`]
    pub phase: String,
    pub time_remaining_seconds: u32,
    /// Elapsed share of the phase in `[0, 100]`
    pub progress_percent: f64,
    pub total_duration_seconds: u32,
    /// Work sessions completed today
    pub session_count: u32,
    pub is_running: bool,
    /// Unix time of the write, with sub-second precision
    pub updated_at_epoch_seconds: f64,
}

impl ExportedState {
    /// Builds the record for `snapshot`, stamped at `updated_at_epoch_seconds`.
    pub fn from_snapshot(
        snapshot: &TimerSnapshot,
        process_id: u32,
        updated_at_epoch_seconds: f64,
    ) -> Self {
        Self {
            process_id,
            phase: snapshot.phase.as_str().to_string(),
            time_remaining_seconds: snapshot.remaining_seconds,
            progress_percent: snapshot.progress_percent(),
            total_duration_seconds: snapshot.total_seconds,
            session_count: snapshot.session_count,
            is_running: snapshot.is_running,
            updated_at_epoch_seconds,
        }
    }

    /// Parses the phase label. `None` for labels this build does not know.
    pub fn phase(&self) -> Option<Phase> {
        Phase::from_label(&self.phase)
    }

    /// Seconds between the write and `now`; negative if the write is in the future.
    pub fn age_seconds(&self, now_epoch_seconds: f64) -> f64 {
        now_epoch_seconds - self.updated_at_epoch_seconds
    }
}

/// Current Unix time in fractional seconds.
pub fn epoch_seconds_now() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
