//! Command definitions for the pomobar CLI.
//!
//! Uses clap derive macro for argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::reader::StatusFormat;
use crate::types::Command;

// ============================================================================
// CLI Structure
// ============================================================================

/// pomobar - a Pomodoro timer for status bars
#[derive(Parser, Debug)]
#[command(
    name = "pomobar",
    version,
    about = "Pomodoro timer daemon with a status-bar friendly state file",
    long_about = "Runs a Pomodoro timer as a background daemon.\n\
                  The daemon publishes its state to a JSON file that status bars poll, \
                  and accepts toggle/start/pause/reset/skip/raise commands over a Unix socket.",
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (default: <config dir>/pomobar/config.json)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Exported state file
    #[arg(long, global = true, value_name = "FILE")]
    pub state_file: Option<PathBuf>,

    /// Daemon command socket
    #[arg(long, global = true, value_name = "FILE")]
    pub socket: Option<PathBuf>,
}

// ============================================================================
// Subcommands
// ============================================================================

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the timer daemon in the foreground
    Daemon(DaemonArgs),

    /// Start if paused, pause if running
    Toggle,

    /// Start the countdown
    Start,

    /// Pause the countdown
    Pause,

    /// Reset the current phase
    Reset,

    /// Skip to the next phase
    Skip,

    /// Ask the UI to come forward
    Raise,

    /// Run a command from a pomobar:// URL
    Open {
        /// URL such as pomobar://toggle
        url: String,
    },

    /// Print a one-line status for status bars
    Status(StatusArgs),

    /// Generate shell completion scripts
    Completions {
        /// Shell type for completion script
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

impl Commands {
    /// The daemon command this subcommand sends, if any.
    pub fn timer_command(&self) -> Option<Command> {
        match self {
            Commands::Toggle => Some(Command::Toggle),
            Commands::Start => Some(Command::Start),
            Commands::Pause => Some(Command::Pause),
            Commands::Reset => Some(Command::Reset),
            Commands::Skip => Some(Command::Skip),
            Commands::Raise => Some(Command::Raise),
            _ => None,
        }
    }
}

// ============================================================================
// Arguments
// ============================================================================

/// Arguments for the daemon command
#[derive(Args, Debug, Clone, Default)]
pub struct DaemonArgs {
    /// Daily session counter file
    #[arg(long, value_name = "FILE")]
    pub session_store: Option<PathBuf>,
}

/// Arguments for the status command
#[derive(Args, Debug, Clone, Default)]
pub struct StatusArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = StatusFormat::Text)]
    pub format: StatusFormat,

    /// Staleness window in seconds (default from config)
    #[arg(
        long,
        value_name = "SECS",
        value_parser = clap::value_parser!(u64).range(1..=3600)
    )]
    pub stale_after: Option<u64>,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ------------------------------------------------------------------------
    // Cli Tests
    // ------------------------------------------------------------------------

    mod cli_tests {
        use super::*;

        #[test]
        fn test_parse_no_args() {
            let cli = Cli::parse_from(["pomobar"]);
            assert!(cli.command.is_none());
            assert!(!cli.verbose);
            assert!(cli.config.is_none());
        }

        #[test]
        fn test_parse_short_verbose_flag() {
            let cli = Cli::parse_from(["pomobar", "-v", "toggle"]);
            assert!(cli.verbose);
        }

        #[test]
        fn test_global_paths_after_subcommand() {
            let cli = Cli::parse_from([
                "pomobar",
                "skip",
                "--socket",
                "/tmp/p.sock",
                "--state-file",
                "/tmp/state.json",
            ]);
            assert_eq!(cli.socket, Some(PathBuf::from("/tmp/p.sock")));
            assert_eq!(cli.state_file, Some(PathBuf::from("/tmp/state.json")));
        }

        #[test]
        fn test_timer_commands_map_one_to_one() {
            let cases = [
                ("toggle", Command::Toggle),
                ("start", Command::Start),
                ("pause", Command::Pause),
                ("reset", Command::Reset),
                ("skip", Command::Skip),
                ("raise", Command::Raise),
            ];
            for (arg, expected) in cases {
                let cli = Cli::parse_from(["pomobar", arg]);
                assert_eq!(cli.command.unwrap().timer_command(), Some(expected));
            }
        }

        #[test]
        fn test_parse_open() {
            let cli = Cli::parse_from(["pomobar", "open", "pomobar://skip"]);
            match cli.command {
                Some(Commands::Open { url }) => assert_eq!(url, "pomobar://skip"),
                other => panic!("Expected Open, got {:?}", other),
            }
        }

        #[test]
        fn test_parse_daemon_session_store() {
            let cli = Cli::parse_from(["pomobar", "daemon", "--session-store", "/tmp/s.json"]);
            match cli.command {
                Some(Commands::Daemon(args)) => {
                    assert_eq!(args.session_store, Some(PathBuf::from("/tmp/s.json")));
                }
                other => panic!("Expected Daemon, got {:?}", other),
            }
        }

        #[test]
        fn test_parse_completions_zsh() {
            let cli = Cli::parse_from(["pomobar", "completions", "zsh"]);
            assert!(matches!(
                cli.command,
                Some(Commands::Completions {
                    shell: clap_complete::Shell::Zsh
                })
            ));
        }
    }

    // ------------------------------------------------------------------------
    // StatusArgs Tests
    // ------------------------------------------------------------------------

    mod status_args_tests {
        use super::*;

        #[test]
        fn test_status_defaults() {
            let cli = Cli::parse_from(["pomobar", "status"]);
            match cli.command {
                Some(Commands::Status(args)) => {
                    assert_eq!(args.format, StatusFormat::Text);
                    assert!(args.stale_after.is_none());
                }
                other => panic!("Expected Status, got {:?}", other),
            }
        }

        #[test]
        fn test_status_json_and_window() {
            let cli =
                Cli::parse_from(["pomobar", "status", "--format", "json", "--stale-after", "30"]);
            match cli.command {
                Some(Commands::Status(args)) => {
                    assert_eq!(args.format, StatusFormat::Json);
                    assert_eq!(args.stale_after, Some(30));
                }
                other => panic!("Expected Status, got {:?}", other),
            }
        }
    }

    // ------------------------------------------------------------------------
    // Error Tests
    // ------------------------------------------------------------------------

    mod error_tests {
        use super::*;

        #[test]
        fn test_parse_unknown_command() {
            assert!(Cli::try_parse_from(["pomobar", "resume"]).is_err());
        }

        #[test]
        fn test_parse_stale_after_zero() {
            assert!(Cli::try_parse_from(["pomobar", "status", "--stale-after", "0"]).is_err());
        }

        #[test]
        fn test_parse_bad_format() {
            assert!(Cli::try_parse_from(["pomobar", "status", "--format", "xml"]).is_err());
        }

        #[test]
        fn test_open_requires_url() {
            assert!(Cli::try_parse_from(["pomobar", "open"]).is_err());
        }

        #[test]
        fn test_parse_completions_invalid_shell() {
            assert!(Cli::try_parse_from(["pomobar", "completions", "tcsh"]).is_err());
        }
    }
}
