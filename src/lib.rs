//! pomobar library
//!
//! This library provides the core functionality of the pomobar timer.
//! It includes:
//! - The phase state machine and break rotation (`types`)
//! - Timer engine, daily session tracking and the serialized runner (`daemon`)
//! - State file export for status bars and the reader-side protocol (`reader`)
//! - Unix socket command intake and client (`daemon::ipc`, `cli`)
//! - Side-effect collaborators: sound, notifications, sleep prevention, UI raise

pub mod cli;
pub mod config;
pub mod daemon;
pub mod fsutil;
pub mod notification;
pub mod power;
pub mod reader;
pub mod sound;
pub mod types;
pub mod ui;

// Re-export commonly used types for convenience
pub use config::{Paths, PomodoroConfig};
pub use daemon::{
    run_daemon, Collaborators, DaemonContext, EngineHandle, EngineSettings, SessionTracker,
    StateExporter, TimerEngine, TimerEvent,
};
pub use reader::{read_source, SourceState};
pub use types::{
    Command, CommandError, ExportedState, IpcRequest, IpcResponse, Phase, PhaseDurations,
    PhaseState, TimerSnapshot,
};

// Re-export collaborator traits
pub use notification::Notifier;
pub use power::SleepInhibitor;
pub use sound::SoundPlayer;
pub use ui::UiRaiser;
