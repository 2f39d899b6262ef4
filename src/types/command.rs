//! Command tokens and the IPC wire format that carries them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::TimerSnapshot;

/// URL scheme accepted by [`Command::from_url`].
pub const URL_SCHEME: &str = "pomobar";

// ============================================================================
// Command
// ============================================================================

/// An external command applied to the timer engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    /// Pause when running, start otherwise
    Toggle,
    /// Start the countdown (no-op when running)
    Start,
    /// Pause the countdown (no-op when stopped)
    Pause,
    /// Restore the full duration of the current phase
    Reset,
    /// Advance to the next phase
    Skip,
    /// Bring the UI forward
    Raise,
}

impl Command {
    pub const ALL: [Command; 6] = [
        Command::Toggle,
        Command::Start,
        Command::Pause,
        Command::Reset,
        Command::Skip,
        Command::Raise,
    ];

    /// Returns the wire token for this command.
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Toggle => "toggle",
            Command::Start => "start",
            Command::Pause => "pause",
            Command::Reset => "reset",
            Command::Skip => "skip",
            Command::Raise => "raise",
        }
    }

    /// Returns true if the command may change timer state.
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Command::Raise)
    }

    /// Parses a scheme-style trigger such as `pomobar://toggle` or `pomobar:skip`.
    ///
    /// A trailing slash or query string after the token is ignored.
    pub fn from_url(url: &str) -> Result<Self, CommandError> {
        let invalid = || CommandError::InvalidUrl(url.to_string());

        let (scheme, rest) = url.trim().split_once(':').ok_or_else(invalid)?;
        if !scheme.eq_ignore_ascii_case(URL_SCHEME) {
            return Err(invalid());
        }

        let token = rest
            .trim_start_matches('/')
            .split(['/', '?', '#'])
            .next()
            .unwrap_or_default();
        if token.is_empty() {
            return Err(invalid());
        }

        token.parse()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().to_ascii_lowercase();
        Command::ALL
            .into_iter()
            .find(|command| command.as_str() == token)
            .ok_or_else(|| CommandError::InvalidCommand(s.to_string()))
    }
}

/// Whether applying a command changed timer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandOutcome {
    Changed,
    Unchanged,
}

impl CommandOutcome {
    pub fn from_changed(changed: bool) -> Self {
        if changed {
            CommandOutcome::Changed
        } else {
            CommandOutcome::Unchanged
        }
    }

    pub fn is_changed(&self) -> bool {
        matches!(self, CommandOutcome::Changed)
    }
}

// ============================================================================
// CommandError
// ============================================================================

/// Errors raised while accepting a command.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    /// Unrecognized command token
    #[error("invalid command: {0:?} (expected one of toggle, start, pause, reset, skip, raise)")]
    InvalidCommand(String),

    /// Malformed scheme-style trigger
    #[error("invalid command url: {0:?} (expected pomobar://<command>)")]
    InvalidUrl(String),

    /// The engine task has shut down
    #[error("timer engine is not running")]
    EngineUnavailable,
}

impl CommandError {
    /// Returns true if the caller supplied something unparseable.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            CommandError::InvalidCommand(_) | CommandError::InvalidUrl(_)
        )
    }
}

// ============================================================================
// IPC
// ============================================================================

/// IPC request from client to daemon.
///
/// The token is kept as a raw string so an unknown command reaches the
/// daemon and is rejected there with an error reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpcRequest {
    pub command: String,
}

impl IpcRequest {
    pub fn new(command: Command) -> Self {
        Self {
            command: command.as_str().to_string(),
        }
    }

    /// Creates a request carrying an arbitrary token.
    pub fn raw(token: impl Into<String>) -> Self {
        Self {
            command: token.into(),
        }
    }
}

/// Timer state echoed back in a successful response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseData {
    pub phase: String,
    #[serde(rename = "remainingSeconds")]
    pub remaining_seconds: u32,
    #[serde(rename = "sessionCount")]
    pub session_count: u32,
    #[serde(rename = "isRunning")]
    pub is_running: bool,
}

impl ResponseData {
    pub fn from_snapshot(snapshot: &TimerSnapshot) -> Self {
        Self {
            phase: snapshot.phase.as_str().to_string(),
            remaining_seconds: snapshot.remaining_seconds,
            session_count: snapshot.session_count,
            is_running: snapshot.is_running,
        }
    }
}

/// IPC response from daemon to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpcResponse {
    /// Response status ("success" or "error")
    pub status: String,
    /// Human-readable message
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
}

impl IpcResponse {
    /// Creates a success response.
    pub fn success(message: impl Into<String>, data: Option<ResponseData>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
            data,
        }
    }

    /// Creates an error response.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            data: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}
