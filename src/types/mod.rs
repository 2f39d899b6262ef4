//! Core data types for the Pomodoro timer.
//!
//! This module defines the data structures used for:
//! - Phase rotation (work → short break / long break → work)
//! - The pure, in-memory phase state machine
//! - Snapshots handed to the state exporter
//! - Commands and IPC request/response serialization (see [`command`])
//! - The exported state file record (see [`export`])

pub mod command;
pub mod export;

use serde::{Deserialize, Serialize};

pub use command::{Command, CommandError, CommandOutcome, IpcRequest, IpcResponse, ResponseData};
pub use export::{epoch_seconds_now, ExportedState};

// ============================================================================
// Phase
// ============================================================================

/// A countdown segment of the Pomodoro cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Focused work
    #[default]
    Work,
    /// Short break between work sessions
    ShortBreak,
    /// Long break after every N work sessions
    LongBreak,
}

impl Phase {
    /// All phases, in rotation order of first appearance.
    pub const ALL: [Phase; 3] = [Phase::Work, Phase::ShortBreak, Phase::LongBreak];

    /// Returns the wire label of the phase.
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Work => "work",
            Phase::ShortBreak => "short_break",
            Phase::LongBreak => "long_break",
        }
    }

    /// Parses a wire label produced by [`Phase::as_str`].
    pub fn from_label(label: &str) -> Option<Self> {
        Phase::ALL.into_iter().find(|phase| phase.as_str() == label)
    }

    /// Human readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Phase::Work => "Work",
            Phase::ShortBreak => "Short break",
            Phase::LongBreak => "Long break",
        }
    }

    /// Returns true for either break phase.
    pub fn is_break(&self) -> bool {
        matches!(self, Phase::ShortBreak | Phase::LongBreak)
    }
}

// ============================================================================
// PhaseDurations
// ============================================================================

/// Nominal duration of each phase, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseDurations {
    pub work_secs: u32,
    pub short_break_secs: u32,
    pub long_break_secs: u32,
}

impl Default for PhaseDurations {
    fn default() -> Self {
        Self {
            work_secs: 25 * 60,
            short_break_secs: 5 * 60,
            long_break_secs: 15 * 60,
        }
    }
}

impl PhaseDurations {
    /// Creates durations from explicit second counts.
    ///
    /// Zero-length phases are bumped to one second so a phase can always be
    /// started.
    pub fn from_secs(work_secs: u32, short_break_secs: u32, long_break_secs: u32) -> Self {
        Self {
            work_secs: work_secs.max(1),
            short_break_secs: short_break_secs.max(1),
            long_break_secs: long_break_secs.max(1),
        }
    }

    /// Returns the duration of `phase` in seconds.
    pub fn duration(&self, phase: Phase) -> u32 {
        match phase {
            Phase::Work => self.work_secs,
            Phase::ShortBreak => self.short_break_secs,
            Phase::LongBreak => self.long_break_secs,
        }
    }
}

// ============================================================================
// BreakRotation
// ============================================================================

/// Decides which break follows a work phase.
///
/// Counts completed work sessions since the last long break. This counter
/// is independent of the daily session count: it never resets at midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakRotation {
    sessions_before_long_break: u32,
    since_long_break: u32,
    total_completed: u64,
}

impl Default for BreakRotation {
    fn default() -> Self {
        Self::new(4)
    }
}

impl BreakRotation {
    /// Creates a rotation that grants a long break every `sessions_before_long_break` sessions.
    pub fn new(sessions_before_long_break: u32) -> Self {
        Self {
            sessions_before_long_break: sessions_before_long_break.max(1),
            since_long_break: 0,
            total_completed: 0,
        }
    }

    /// Creates a rotation that has already counted `completed` sessions.
    pub fn with_completed(sessions_before_long_break: u32, completed: u32) -> Self {
        let mut rotation = Self::new(sessions_before_long_break);
        for _ in 0..completed {
            rotation.record_work_session();
            if rotation.long_break_due() {
                rotation.since_long_break = 0;
            }
        }
        rotation
    }

    /// Counts one completed work session.
    pub fn record_work_session(&mut self) {
        self.since_long_break += 1;
        self.total_completed += 1;
    }

    /// Returns true when the next break should be a long one.
    pub fn long_break_due(&self) -> bool {
        self.since_long_break >= self.sessions_before_long_break
    }

    /// Returns the phase that follows `current`, consuming a pending long break.
    pub fn advance(&mut self, current: Phase) -> Phase {
        match current {
            Phase::Work if self.long_break_due() => {
                self.since_long_break = 0;
                Phase::LongBreak
            }
            Phase::Work => Phase::ShortBreak,
            Phase::ShortBreak | Phase::LongBreak => Phase::Work,
        }
    }

    /// Work sessions counted since the last long break.
    pub fn since_long_break(&self) -> u32 {
        self.since_long_break
    }

    /// Work sessions counted since the process started.
    pub fn total_completed(&self) -> u64 {
        self.total_completed
    }
}

// ============================================================================
// PhaseState
// ============================================================================

/// The phase, countdown and running flag of the timer.
///
/// Pure in-memory state with no I/O. `remaining_seconds` always stays in
/// `[0, duration(phase)]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseState {
    phase: Phase,
    remaining_seconds: u32,
    is_running: bool,
    durations: PhaseDurations,
}

impl PhaseState {
    /// Creates a stopped work phase with a full countdown.
    pub fn new(durations: PhaseDurations) -> Self {
        Self {
            phase: Phase::Work,
            remaining_seconds: durations.duration(Phase::Work),
            is_running: false,
            durations,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn durations(&self) -> PhaseDurations {
        self.durations
    }

    /// Nominal duration of the current phase.
    pub fn total_seconds(&self) -> u32 {
        self.durations.duration(self.phase)
    }

    /// Starts the countdown.
    ///
    /// Returns false (and does nothing) when already running or when the
    /// phase has no time left; a finished phase must be skipped or reset.
    pub fn start(&mut self) -> bool {
        if self.is_running || self.remaining_seconds == 0 {
            return false;
        }
        self.is_running = true;
        true
    }

    /// Stops the countdown, keeping the remaining time.
    ///
    /// Returns true if the timer was running.
    pub fn pause(&mut self) -> bool {
        let was_running = self.is_running;
        self.is_running = false;
        was_running
    }

    /// Decrements the countdown by one second, floored at zero.
    ///
    /// Does nothing while stopped. Never changes the phase.
    pub fn tick(&mut self) {
        if !self.is_running {
            return;
        }
        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
    }

    /// Restores the full duration of the current phase and stops.
    ///
    /// Returns true if anything changed.
    pub fn reset(&mut self) -> bool {
        let total = self.total_seconds();
        let changed = self.is_running || self.remaining_seconds != total;
        self.remaining_seconds = total;
        self.is_running = false;
        changed
    }

    /// Advances to the next phase with a full, stopped countdown.
    ///
    /// Session counting is the caller's job and must happen before this call.
    pub fn skip(&mut self, rotation: &mut BreakRotation) -> Phase {
        self.phase = rotation.advance(self.phase);
        self.remaining_seconds = self.total_seconds();
        self.is_running = false;
        self.phase
    }

    /// True when the running countdown has reached zero.
    pub fn should_complete(&self) -> bool {
        self.is_running && self.remaining_seconds == 0
    }

    /// Elapsed share of the current phase, clamped to `[0, 100]`.
    pub fn progress_percent(&self) -> f64 {
        progress_percent(self.total_seconds(), self.remaining_seconds)
    }
}

/// Computes `(total - remaining) / total * 100`, clamped to `[0, 100]`.
pub fn progress_percent(total_seconds: u32, remaining_seconds: u32) -> f64 {
    if total_seconds == 0 {
        return 0.0;
    }
    let total = f64::from(total_seconds);
    let elapsed = total - f64::from(remaining_seconds);
    (elapsed / total * 100.0).clamp(0.0, 100.0)
}

// ============================================================================
// TimerSnapshot
// ============================================================================

/// Observable engine state at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub phase: Phase,
    pub remaining_seconds: u32,
    pub total_seconds: u32,
    pub session_count: u32,
    pub is_running: bool,
}

impl TimerSnapshot {
    /// Builds a snapshot from the phase state and the daily session count.
    pub fn capture(state: &PhaseState, session_count: u32) -> Self {
        Self {
            phase: state.phase(),
            remaining_seconds: state.remaining_seconds(),
            total_seconds: state.total_seconds(),
            session_count,
            is_running: state.is_running(),
        }
    }

    pub fn progress_percent(&self) -> f64 {
        progress_percent(self.total_seconds, self.remaining_seconds)
    }
}

// ============================================================================
// Tests
// ============================================================================
