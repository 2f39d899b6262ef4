//! Desktop notifications for phase completion.
//!
//! The engine calls [`Notifier::schedule_phase_complete_notification`] once
//! per natural completion. The call returns as soon as the notification is
//! scheduled; delivery runs on the tokio runtime and its result is only
//! logged.
//!
//! Delivery goes through `notify-rust`: the freedesktop notification server
//! over D-Bus on Linux and the notification center on macOS.

mod content;
pub mod error;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use notify_rust::Notification;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};

pub use self::content::NotificationContent;
pub use self::error::NotificationError;

use crate::types::Phase;

/// Default delivery timeout in seconds.
const DEFAULT_TIMEOUT_SECONDS: u64 = 5;

const APP_NAME: &str = "pomobar";

/// Trait for notification senders.
pub trait Notifier: Send {
    /// Schedules the "phase complete" notification without waiting for delivery.
    fn schedule_phase_complete_notification(
        &self,
        completed: Phase,
        session_count: u32,
    ) -> Result<(), NotificationError>;
}

impl<T: Notifier + Sync + ?Sized> Notifier for Arc<T> {
    fn schedule_phase_complete_notification(
        &self,
        completed: Phase,
        session_count: u32,
    ) -> Result<(), NotificationError> {
        (**self).schedule_phase_complete_notification(completed, session_count)
    }
}

// ============================================================================
// NotifyRustNotifier
// ============================================================================

/// Sends notifications through the desktop notification server.
///
/// `show()` blocks on the session bus, so each notification runs on the
/// blocking pool and only its outcome is logged.
#[derive(Debug, Clone)]
pub struct NotifyRustNotifier {
    timeout: Duration,
}

impl Default for NotifyRustNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyRustNotifier {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Builds the desktop notification for `content`.
fn build_notification(content: &NotificationContent) -> Notification {
    let mut notification = Notification::new();
    notification
        .summary(&content.title)
        .body(&content.body)
        .appname(APP_NAME);
    notification
}

impl Notifier for NotifyRustNotifier {
    fn schedule_phase_complete_notification(
        &self,
        completed: Phase,
        session_count: u32,
    ) -> Result<(), NotificationError> {
        let handle = Handle::try_current().map_err(|_| NotificationError::NoRuntime)?;
        let content = NotificationContent::phase_complete(completed, session_count);
        let notification = build_notification(&content);
        let limit = self.timeout;

        handle.spawn(async move {
            let shown = tokio::task::spawn_blocking(move || {
                notification
                    .show()
                    .map(|_| ())
                    .map_err(NotificationError::from)
            });
            match await_delivery(shown, limit).await {
                Ok(()) => debug!(title = %content.title, "Notification sent"),
                Err(e) => warn!(error = %e, suggestion = e.suggestion(), "Notification failed"),
            }
        });
        Ok(())
    }
}

/// Waits for a blocking delivery task, giving up after `limit`.
async fn await_delivery(
    task: JoinHandle<Result<(), NotificationError>>,
    limit: Duration,
) -> Result<(), NotificationError> {
    timeout(limit, task)
        .await
        .map_err(|_| NotificationError::Timeout(limit.as_secs()))?
        .map_err(|e| NotificationError::SendFailed(e.to_string()))?
}

// ============================================================================
// Other notifiers
// ============================================================================

/// Notifier used when notifications are disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledNotifier;

impl Notifier for DisabledNotifier {
    fn schedule_phase_complete_notification(
        &self,
        completed: Phase,
        _session_count: u32,
    ) -> Result<(), NotificationError> {
        debug!(phase = completed.as_str(), "Notifications disabled");
        Ok(())
    }
}

/// Creates the notifier for the daemon.
pub fn try_create_notifier(enabled: bool) -> Box<dyn Notifier> {
    if !enabled {
        return Box::new(DisabledNotifier);
    }
    Box::new(NotifyRustNotifier::new())
}

/// Mock notifier for testing.
#[derive(Debug, Default)]
pub struct MockNotifier {
    sent: Mutex<Vec<(Phase, u32)>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(completed phase, session count)` pairs, in order.
    pub fn sent(&self) -> Vec<(Phase, u32)> {
        match self.sent.lock() {
            Ok(sent) => sent.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Notifier for MockNotifier {
    fn schedule_phase_complete_notification(
        &self,
        completed: Phase,
        session_count: u32,
    ) -> Result<(), NotificationError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((completed, session_count));
        }
        Ok(())
    }
}
