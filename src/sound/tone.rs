//! Synthesized chimes played when a phase ends.

use std::time::Duration;

use crate::types::Phase;

/// A short sequence of sine notes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneSpec {
    /// Note frequencies in Hz, played in order
    pub frequencies: &'static [f32],
    pub note: Duration,
    /// Silence between notes
    pub gap: Duration,
    /// Linear gain applied to every note
    pub volume: f32,
}

impl ToneSpec {
    /// Chime announcing that `completed` has just ended.
    ///
    /// Work ending rises (time for a break), a break ending falls.
    pub fn for_completed(completed: Phase) -> Self {
        match completed {
            Phase::Work => Self {
                frequencies: &[523.25, 659.25, 783.99],
                note: Duration::from_millis(180),
                gap: Duration::from_millis(60),
                volume: 0.25,
            },
            Phase::ShortBreak => Self {
                frequencies: &[783.99, 523.25],
                note: Duration::from_millis(220),
                gap: Duration::from_millis(80),
                volume: 0.25,
            },
            Phase::LongBreak => Self {
                frequencies: &[783.99, 659.25, 523.25],
                note: Duration::from_millis(260),
                gap: Duration::from_millis(80),
                volume: 0.25,
            },
        }
    }

    /// Total playing time including gaps.
    pub fn total_duration(&self) -> Duration {
        let notes = self.frequencies.len() as u32;
        self.note * notes + self.gap * notes.saturating_sub(1)
    }
}
