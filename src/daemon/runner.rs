//! The single serialized execution context for the timer engine.
//!
//! One task owns the [`TimerEngine`] and multiplexes the 1 Hz ticker with
//! the command queue, so a command and a tick can never interleave. Other
//! tasks reach the engine through a cloneable [`EngineHandle`].

use std::future::Future;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, Duration, Interval, MissedTickBehavior};
use tracing::debug;

use super::timer::TimerEngine;
use crate::types::{Command, CommandError, CommandOutcome, TimerSnapshot};

/// Default tick period.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Default bound of the command queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 32;

/// Result of a dispatched command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommandReply {
    pub outcome: CommandOutcome,
    /// Engine state right after the command
    pub snapshot: TimerSnapshot,
}

struct EngineRequest {
    command: Command,
    reply: oneshot::Sender<CommandReply>,
}

/// Sends commands to the runner task.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
}

impl EngineHandle {
    /// Queues `command` and waits until the engine has applied it.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::EngineUnavailable` if the runner has stopped.
    pub async fn dispatch(&self, command: Command) -> Result<CommandReply, CommandError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(EngineRequest { command, reply })
            .await
            .map_err(|_| CommandError::EngineUnavailable)?;
        response.await.map_err(|_| CommandError::EngineUnavailable)
    }
}

impl std::fmt::Debug for EngineRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineRequest")
            .field("command", &self.command)
            .finish_non_exhaustive()
    }
}

/// Creates a runner around `engine` and a handle for sending it commands.
pub fn channel(engine: TimerEngine, capacity: usize) -> (Runner, EngineHandle) {
    let (tx, requests) = mpsc::channel(capacity.max(1));
    let runner = Runner {
        engine,
        requests,
        tick_period: TICK_PERIOD,
    };
    (runner, EngineHandle { tx })
}

/// Owns the engine and drives it.
pub struct Runner {
    engine: TimerEngine,
    requests: mpsc::Receiver<EngineRequest>,
    tick_period: Duration,
}

impl Runner {
    /// Overrides the tick period (tests use a few milliseconds).
    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.tick_period = period;
        self
    }

    /// Runs until `shutdown` resolves, then hands the engine back.
    ///
    /// Ticks are only scheduled while the engine is running. The ticker is
    /// re-armed whenever a command starts the countdown, so the first tick
    /// lands one full period after the start. While idle, the same period
    /// drives a calendar check so the daily count resets at midnight.
    pub async fn run<F>(mut self, shutdown: F) -> TimerEngine
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let mut ticker = interval(self.tick_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker.reset();

        let mut day_check = interval(self.tick_period);
        day_check.set_missed_tick_behavior(MissedTickBehavior::Skip);
        day_check.reset();

        let mut commands_open = true;

        loop {
            let running = self.engine.is_running();
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    debug!("Runner shutting down");
                    break;
                }

                request = self.requests.recv(), if commands_open => match request {
                    Some(request) => self.apply(request, &mut ticker),
                    None => {
                        debug!("All engine handles dropped");
                        commands_open = false;
                    }
                },

                _ = ticker.tick(), if running => {
                    self.engine.tick();
                }

                _ = day_check.tick(), if !running => {
                    self.engine.refresh_day();
                }
            }
        }

        self.engine
    }

    fn apply(&mut self, request: EngineRequest, ticker: &mut Interval) {
        let was_running = self.engine.is_running();
        let outcome = self.engine.execute(request.command);
        if !was_running && self.engine.is_running() {
            ticker.reset();
        }

        let snapshot = self.engine.snapshot();
        if request.reply.send(CommandReply { outcome, snapshot }).is_err() {
            debug!(command = %request.command, "Caller went away before the reply");
        }
    }
}
