//! Sleep prevention error types.

use thiserror::Error;

/// Errors that can occur while acquiring a sleep-prevention token.
#[derive(Debug, Error)]
pub enum SleepInhibitError {
    /// No supported inhibitor command was found.
    #[error("no sleep inhibitor available (looked for {0})")]
    NotAvailable(&'static str),

    /// The inhibitor process could not be started.
    #[error("failed to start sleep inhibitor: {0}")]
    SpawnFailed(#[from] std::io::Error),

    /// The inhibitor process exited right after starting.
    #[error("sleep inhibitor exited immediately: {0}")]
    ExitedEarly(String),
}
