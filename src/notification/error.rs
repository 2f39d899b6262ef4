//! Notification system error types.

use thiserror::Error;

/// Errors that can occur while sending desktop notifications.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// Notifications can only be spawned from inside the tokio runtime.
    #[error("notifications require a running tokio runtime")]
    NoRuntime,

    /// The notification server rejected the notification or is unreachable.
    #[error("failed to send notification: {0}")]
    SendFailed(String),

    /// The notification server did not answer in time.
    #[error("notification timed out after {0}s")]
    Timeout(u64),
}

impl From<notify_rust::error::Error> for NotificationError {
    fn from(err: notify_rust::error::Error) -> Self {
        Self::SendFailed(err.to_string())
    }
}

impl NotificationError {
    /// Returns a user-friendly suggestion for resolving this error.
    #[must_use]
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::NoRuntime => "run the notifier from the daemon",
            Self::SendFailed(_) => "check that a notification daemon is running",
            Self::Timeout(_) => "check that the notification daemon is responsive",
        }
    }
}
