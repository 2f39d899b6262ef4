//! Notification content construction.

use crate::types::Phase;

/// Title and body of a desktop notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationContent {
    pub title: String,
    pub body: String,
}

impl NotificationContent {
    /// Content announcing that `completed` has ended.
    ///
    /// `session_count` is today's count after any increment for this completion.
    pub fn phase_complete(completed: Phase, session_count: u32) -> Self {
        let sessions = match session_count {
            1 => "1 session today".to_string(),
            n => format!("{n} sessions today"),
        };
        match completed {
            Phase::Work => Self {
                title: "Work session complete".to_string(),
                body: format!("Time for a break. {sessions}."),
            },
            Phase::ShortBreak => Self {
                title: "Break is over".to_string(),
                body: format!("Back to work. {sessions}."),
            },
            Phase::LongBreak => Self {
                title: "Long break is over".to_string(),
                body: format!("Ready for the next round? {sessions}."),
            },
        }
    }
}
