//! Display utilities for the pomobar CLI.
//!
//! This module provides formatted output for:
//! - Command acknowledgements
//! - Error messages
//! - Status-bar lines

use crate::reader::render::format_clock;
use crate::reader::{StatusFormat, StatusLine};
use crate::types::{Command, IpcResponse, Phase};

// ============================================================================
// Display
// ============================================================================

/// Display utilities for CLI output.
pub struct Display;

impl Display {
    /// Shows the acknowledgement for a command sent to the daemon.
    pub fn show_command_result(command: Command, response: &IpcResponse) {
        println!("{}", Self::format_command_result(command, response));
    }

    /// Shows a status line in the requested format.
    pub fn show_status(line: &StatusLine, format: StatusFormat) {
        println!("{}", line.render(format));
    }

    /// Shows an error message.
    pub fn show_error(message: &str) {
        eprintln!("Error: {}", message);
    }

    fn format_command_result(command: Command, response: &IpcResponse) -> String {
        let Some(data) = &response.data else {
            return response.message.clone();
        };
        if command == Command::Raise {
            return response.message.clone();
        }

        let phase = Phase::from_label(&data.phase)
            .map(|phase| phase.display_name())
            .unwrap_or(data.phase.as_str());
        let state = if data.is_running { "running" } else { "paused" };
        format!(
            "{} ({} {}, {} left, #{})",
            response.message,
            phase,
            state,
            format_clock(data.remaining_seconds),
            data.session_count
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
