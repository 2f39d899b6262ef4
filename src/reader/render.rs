//! Compact status-bar rendering of a [`SourceState`].

use serde::Serialize;

use super::SourceState;
use crate::types::{ExportedState, Phase};

/// Text shown whenever the source is not live.
pub const FALLBACK_TEXT: &str = "🍅 --:--";

/// Output format of `pomobar status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum StatusFormat {
    /// One line, e.g. `🍅 24:59 #3`
    #[default]
    Text,
    /// Waybar-style object with text, tooltip, class and percentage
    Json,
}

/// One rendered status line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusLine {
    pub text: String,
    pub tooltip: String,
    pub class: String,
    pub percentage: u8,
}

impl StatusLine {
    pub fn from_source(source: &SourceState) -> Self {
        match source {
            SourceState::Live(record) => Self::live(record),
            SourceState::Stale(record) => Self {
                text: FALLBACK_TEXT.to_string(),
                tooltip: format!(
                    "Timer state is stale ({} left when last seen)",
                    format_clock(record.time_remaining_seconds)
                ),
                class: "stale".to_string(),
                percentage: 0,
            },
            SourceState::Disconnected(reason) => Self {
                text: FALLBACK_TEXT.to_string(),
                tooltip: format!("Timer not connected: {reason}"),
                class: "disconnected".to_string(),
                percentage: 0,
            },
        }
    }

    fn live(record: &ExportedState) -> Self {
        let phase = record.phase().unwrap_or_default();
        let icon = if record.is_running {
            phase_icon(phase)
        } else {
            "⏸"
        };
        let clock = format_clock(record.time_remaining_seconds);
        let class = if record.is_running {
            phase.as_str()
        } else {
            "paused"
        };

        Self {
            text: format!("{icon} {clock} #{}", record.session_count),
            tooltip: format!(
                "{}: {clock} remaining, {} sessions today",
                phase.display_name(),
                record.session_count
            ),
            class: class.to_string(),
            percentage: record.progress_percent.round().clamp(0.0, 100.0) as u8,
        }
    }

    /// Renders in the requested format.
    pub fn render(&self, format: StatusFormat) -> String {
        match format {
            StatusFormat::Text => self.text.clone(),
            // Only string and integer fields, serialization cannot fail.
            StatusFormat::Json => serde_json::to_string(self).unwrap_or_default(),
        }
    }
}

fn phase_icon(phase: Phase) -> &'static str {
    match phase {
        Phase::Work => "🍅",
        Phase::ShortBreak => "☕",
        Phase::LongBreak => "🌴",
    }
}

/// Formats seconds as `MM:SS`.
pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::DisconnectReason;
    use crate::types::TimerSnapshot;

    fn record(phase: Phase, remaining: u32, running: bool) -> ExportedState {
        let durations = crate::types::PhaseDurations::default();
        let snapshot = TimerSnapshot {
            phase,
            remaining_seconds: remaining,
            total_seconds: durations.duration(phase),
            session_count: 3,
            is_running: running,
        };
        ExportedState::from_snapshot(&snapshot, 1, 0.0)
    }

    #[test]
    fn test_running_work() {
        let line = StatusLine::from_source(&SourceState::Live(record(Phase::Work, 1499, true)));
        assert_eq!(line.text, "🍅 24:59 #3");
        assert_eq!(line.class, "work");
        assert_eq!(line.percentage, 0);
    }

    #[test]
    fn test_paused_shows_pause_icon() {
        let line = StatusLine::from_source(&SourceState::Live(record(Phase::Work, 1499, false)));
        assert_eq!(line.text, "⏸ 24:59 #3");
        assert_eq!(line.class, "paused");
    }

    #[test]
    fn test_break_icons() {
        let short = StatusLine::from_source(&SourceState::Live(record(Phase::ShortBreak, 252, true)));
        assert_eq!(short.text, "☕ 04:12 #3");

        let long = StatusLine::from_source(&SourceState::Live(record(Phase::LongBreak, 840, true)));
        assert_eq!(long.text, "🌴 14:00 #3");
        assert_eq!(long.percentage, 7);
    }

    #[test]
    fn test_stale_and_disconnected_fall_back() {
        let stale = StatusLine::from_source(&SourceState::Stale(record(Phase::Work, 600, true)));
        assert_eq!(stale.text, FALLBACK_TEXT);
        assert_eq!(stale.class, "stale");
        assert!(stale.tooltip.contains("10:00"));

        let gone = StatusLine::from_source(&SourceState::Disconnected(DisconnectReason::Missing));
        assert_eq!(gone.text, FALLBACK_TEXT);
        assert_eq!(gone.class, "disconnected");
        assert_eq!(gone.percentage, 0);
    }

    #[test]
    fn test_json_format() {
        let line = StatusLine::from_source(&SourceState::Live(record(Phase::Work, 900, true)));
        let value: serde_json::Value =
            serde_json::from_str(&line.render(StatusFormat::Json)).unwrap();
        assert_eq!(value["text"], "🍅 15:00 #3");
        assert_eq!(value["class"], "work");
        assert_eq!(value["percentage"], 40);
        assert!(value["tooltip"].as_str().unwrap().contains("Work"));
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(59), "00:59");
        assert_eq!(format_clock(7200), "120:00");
    }
}
