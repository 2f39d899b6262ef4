//! Daemon module for the Pomodoro Timer.
//!
//! This module contains the core daemon functionality:
//! - `session`: Daily session counter with day rollover
//! - `timer`: Timer engine with state transitions and side effects
//! - `runner`: Serialized execution context (ticks + command queue)
//! - `export`: State file writer for external readers
//! - `ipc`: Unix socket command intake

pub mod export;
pub mod ipc;
pub mod runner;
pub mod session;
pub mod timer;

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tracing::{info, warn};

pub use export::{ExportError, StateExporter};
pub use ipc::{IpcError, IpcServer, RequestHandler};
pub use runner::{CommandReply, EngineHandle, Runner};
pub use session::{
    Clock, DailyCount, JsonSessionStore, PersistenceError, SessionStore, SessionTracker,
    SystemClock,
};
pub use timer::{ChangeKind, Collaborators, EngineSettings, TimerEngine, TimerEvent};

use crate::config::{Paths, PomodoroConfig};

/// Everything a daemon process needs, built once at startup.
#[derive(Debug, Clone)]
pub struct DaemonContext {
    pub config: PomodoroConfig,
    pub paths: Paths,
    pub tick_period: Duration,
}

impl DaemonContext {
    pub fn new(config: PomodoroConfig, paths: Paths) -> Self {
        Self {
            config,
            paths,
            tick_period: runner::TICK_PERIOD,
        }
    }

    /// Overrides the tick period (tests only; the countdown is in seconds).
    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.tick_period = period;
        self
    }
}

/// Runs the daemon until SIGINT or SIGTERM.
pub async fn run_daemon(ctx: DaemonContext) -> Result<()> {
    let collaborators = Collaborators::from_config(&ctx.config);
    run_daemon_with(ctx, collaborators, shutdown_signal()).await
}

/// Runs the daemon with explicit collaborators until `shutdown` resolves.
///
/// On shutdown the socket is closed, the engine is dropped (releasing
/// sleep prevention) and the exporter removes the state file.
pub async fn run_daemon_with<F>(
    ctx: DaemonContext,
    collaborators: Collaborators,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()>,
{
    ctx.config.validate().context("Invalid configuration")?;

    // Bind first so a second daemon fails before touching the state file.
    let server = IpcServer::new(&ctx.paths.socket_path)?;

    let sessions = SessionTracker::load(
        Box::new(JsonSessionStore::new(&ctx.paths.session_store)),
        Box::new(SystemClock),
    );
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let mut engine = TimerEngine::new(
        EngineSettings::from_config(&ctx.config),
        sessions,
        collaborators,
        event_tx,
    );

    let exporter = StateExporter::from_config(&ctx.paths.state_file, &ctx.config);
    let exporter_task = tokio::spawn(exporter.run(event_rx));
    engine.announce();

    let (runner, handle) = runner::channel(engine, runner::DEFAULT_QUEUE_CAPACITY);
    let ipc_task = tokio::spawn(ipc::serve(server, RequestHandler::new(handle)));

    info!(
        pid = std::process::id(),
        socket = %ctx.paths.socket_path.display(),
        state_file = %ctx.paths.state_file.display(),
        "Daemon started"
    );

    let engine = runner.with_tick_period(ctx.tick_period).run(shutdown).await;

    ipc_task.abort();
    let _ = ipc_task.await;
    drop(engine);
    exporter_task
        .await
        .context("State exporter task failed")?;

    info!("Daemon stopped");
    Ok(())
}

/// Resolves on the first SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
