//! pomobar - a Pomodoro timer for status bars
//!
//! The daemon counts down work and break phases and publishes its state
//! to a JSON file; every other subcommand is a short-lived client:
//! - timer commands go to the daemon over its Unix socket
//! - `status` reads the state file and prints one status-bar line

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use tracing::warn;

use pomobar::cli::{Cli, Commands, Display, IpcClient, StatusArgs};
use pomobar::config::{load_config, Paths, PomodoroConfig};
use pomobar::daemon::{run_daemon, DaemonContext};
use pomobar::reader::{self, DisconnectReason, SourceState, StatusLine};
use pomobar::types::{Command, CommandError};

/// Main entry point
#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    init_tracing(cli.verbose);

    // Execute command
    if let Err(e) = execute(cli).await {
        Display::show_error(&format!("{:#}", e));
        std::process::exit(exit_code(&e));
    }
}

/// Usage errors exit with 2 like clap's own; everything else with 1.
fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<CommandError>() {
        Some(e) if e.is_invalid_input() => 2,
        _ => 1,
    }
}

/// Initializes the tracing subscriber for logging.
///
/// Logs go to stderr so `status` output stays machine readable.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

/// Executes the CLI command.
async fn execute(cli: Cli) -> Result<()> {
    let Some(command) = cli.command.clone() else {
        // No command provided, show help
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Completions { shell } => {
            generate_completions(shell);
            Ok(())
        }
        Commands::Status(args) => {
            show_status(&cli, &args);
            Ok(())
        }
        Commands::Daemon(args) => {
            let config = load_config(cli.config.as_deref())?;
            let paths = resolve_paths(&cli)?.with_session_store(args.session_store);
            run_daemon(DaemonContext::new(config, paths)).await
        }
        Commands::Open { url } => {
            let command = Command::from_url(&url)?;
            send_command(&cli, command).await
        }
        other => {
            let command = other
                .timer_command()
                .with_context(|| format!("{:?} is not a timer command", other))?;
            send_command(&cli, command).await
        }
    }
}

fn resolve_paths(cli: &Cli) -> Result<Paths> {
    Ok(Paths::resolve()
        .context("Cannot determine per-user directories")?
        .with_state_file(cli.state_file.clone())
        .with_socket_path(cli.socket.clone()))
}

async fn send_command(cli: &Cli, command: Command) -> Result<()> {
    let paths = resolve_paths(cli)?;
    let client = IpcClient::with_socket_path(paths.socket_path);
    let response = client.send(command).await?;
    Display::show_command_result(command, &response);
    Ok(())
}

/// Prints the status line. Never fails: problems render as the fallback.
fn show_status(cli: &Cli, args: &StatusArgs) {
    let config = load_config(cli.config.as_deref()).unwrap_or_else(|e| {
        warn!(error = %e, "Invalid config, using defaults for status");
        PomodoroConfig::default()
    });
    let window = args
        .stale_after
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.staleness_window());

    let source = match resolve_paths(cli) {
        Ok(paths) => reader::read_source_now(&paths.state_file, window),
        Err(e) => {
            warn!(error = %e, "Cannot locate state file");
            SourceState::Disconnected(DisconnectReason::Missing)
        }
    };
    Display::show_status(&StatusLine::from_source(&source), args.format);
}

/// Generates shell completion scripts.
fn generate_completions(shell: clap_complete::Shell) {
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}

// ============================================================================
// Tests
// ============================================================================
