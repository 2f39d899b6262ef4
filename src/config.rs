//! User configuration and well-known file locations.
//!
//! - **Config** (`config.json`): durations, rotation, export cadence and
//!   side-effect toggles, read from the platform config directory.
//! - **Paths**: the exported state file, the daily session store and the
//!   command socket. Each can be overridden from the command line.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::types::PhaseDurations;

const APP_DIR: &str = "pomobar";
const CONFIG_FILE: &str = "config.json";
const STATE_FILE: &str = "state.json";
const SESSION_FILE: &str = "sessions.json";
const SOCKET_DIR: &str = ".pomobar";
const SOCKET_FILE: &str = "pomobar.sock";

// ============================================================================
// ConfigError
// ============================================================================

/// Errors raised while loading or validating the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("could not determine the {0} directory")]
    NoDirectory(&'static str),
}

// ============================================================================
// PomodoroConfig
// ============================================================================

/// Configuration for the Pomodoro timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PomodoroConfig {
    /// Work duration in minutes (1-120)
    pub work_minutes: u32,
    /// Short break duration in minutes (1-60)
    pub short_break_minutes: u32,
    /// Long break duration in minutes (1-60)
    pub long_break_minutes: u32,
    /// Work sessions per long break (1-12)
    pub sessions_before_long_break: u32,
    /// Start the next phase automatically after a natural completion
    pub auto_start_next_phase: bool,
    /// How old an exported record may be before readers distrust it
    pub staleness_window_secs: u64,
    /// Minimum spacing of tick-only state file writes
    pub export_tick_interval_secs: u64,
    /// Rewrite the state file with a fresh timestamp after this much idle time
    pub export_heartbeat_secs: u64,
    pub sound_enabled: bool,
    pub notifications_enabled: bool,
    /// Keep the system awake while the countdown runs
    pub prevent_sleep: bool,
}

impl Default for PomodoroConfig {
    fn default() -> Self {
        Self {
            work_minutes: 25,
            short_break_minutes: 5,
            long_break_minutes: 15,
            sessions_before_long_break: 4,
            auto_start_next_phase: false,
            staleness_window_secs: 10,
            export_tick_interval_secs: 1,
            export_heartbeat_secs: 5,
            sound_enabled: true,
            notifications_enabled: true,
            prevent_sleep: true,
        }
    }
}

impl PomodoroConfig {
    pub fn with_work_minutes(mut self, minutes: u32) -> Self {
        self.work_minutes = minutes;
        self
    }

    pub fn with_short_break_minutes(mut self, minutes: u32) -> Self {
        self.short_break_minutes = minutes;
        self
    }

    pub fn with_long_break_minutes(mut self, minutes: u32) -> Self {
        self.long_break_minutes = minutes;
        self
    }

    pub fn with_sessions_before_long_break(mut self, sessions: u32) -> Self {
        self.sessions_before_long_break = sessions;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=120).contains(&self.work_minutes) {
            return Err(ConfigError::Invalid(
                "work_minutes must be between 1 and 120".to_string(),
            ));
        }
        if !(1..=60).contains(&self.short_break_minutes) {
            return Err(ConfigError::Invalid(
                "short_break_minutes must be between 1 and 60".to_string(),
            ));
        }
        if !(1..=60).contains(&self.long_break_minutes) {
            return Err(ConfigError::Invalid(
                "long_break_minutes must be between 1 and 60".to_string(),
            ));
        }
        if !(1..=12).contains(&self.sessions_before_long_break) {
            return Err(ConfigError::Invalid(
                "sessions_before_long_break must be between 1 and 12".to_string(),
            ));
        }
        if self.staleness_window_secs == 0 {
            return Err(ConfigError::Invalid(
                "staleness_window_secs must be positive".to_string(),
            ));
        }
        if self.export_heartbeat_secs == 0 || self.export_heartbeat_secs >= self.staleness_window_secs
        {
            return Err(ConfigError::Invalid(
                "export_heartbeat_secs must be positive and shorter than staleness_window_secs"
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// Phase durations in seconds.
    pub fn durations(&self) -> PhaseDurations {
        PhaseDurations::from_secs(
            self.work_minutes * 60,
            self.short_break_minutes * 60,
            self.long_break_minutes * 60,
        )
    }

    pub fn staleness_window(&self) -> Duration {
        Duration::from_secs(self.staleness_window_secs)
    }

    pub fn export_tick_interval(&self) -> Duration {
        Duration::from_secs(self.export_tick_interval_secs)
    }

    pub fn export_heartbeat(&self) -> Duration {
        Duration::from_secs(self.export_heartbeat_secs)
    }
}

/// Default config file location (e.g. `~/.config/pomobar/config.json`).
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}

/// Loads the configuration.
///
/// An explicit path must exist and be valid. Without one, the default
/// location is tried and any problem falls back to the defaults with a
/// warning.
pub fn load_config(explicit: Option<&Path>) -> Result<PomodoroConfig, ConfigError> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
            });
        }
        return load_config_from(path);
    }

    let Some(path) = default_config_path() else {
        return Ok(PomodoroConfig::default());
    };
    match load_config_from(&path) {
        Ok(config) => Ok(config),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring config file, using defaults");
            Ok(PomodoroConfig::default())
        }
    }
}

/// Reads and validates a config file. A missing file yields the defaults.
pub fn load_config_from(path: &Path) -> Result<PomodoroConfig, ConfigError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(PomodoroConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let config: PomodoroConfig =
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    config.validate()?;
    Ok(config)
}

// ============================================================================
// Paths
// ============================================================================

/// Files shared between the daemon and its clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    /// Exported state file polled by readers
    pub state_file: PathBuf,
    /// Durable daily session counter
    pub session_store: PathBuf,
    /// Command socket
    pub socket_path: PathBuf,
}

impl Paths {
    /// Resolves the per-user default locations.
    pub fn resolve() -> Result<Self, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoDirectory("config"))?;
        let data_dir = dirs::data_dir().ok_or(ConfigError::NoDirectory("data"))?;
        let home_dir = dirs::home_dir().ok_or(ConfigError::NoDirectory("home"))?;

        Ok(Self {
            state_file: config_dir.join(APP_DIR).join(STATE_FILE),
            session_store: data_dir.join(APP_DIR).join(SESSION_FILE),
            socket_path: home_dir.join(SOCKET_DIR).join(SOCKET_FILE),
        })
    }

    /// Places every file inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            state_file: dir.join(STATE_FILE),
            session_store: dir.join(SESSION_FILE),
            socket_path: dir.join(SOCKET_FILE),
        }
    }

    pub fn with_state_file(mut self, path: Option<PathBuf>) -> Self {
        if let Some(path) = path {
            self.state_file = path;
        }
        self
    }

    pub fn with_session_store(mut self, path: Option<PathBuf>) -> Self {
        if let Some(path) = path {
            self.session_store = path;
        }
        self
    }

    pub fn with_socket_path(mut self, path: Option<PathBuf>) -> Self {
        if let Some(path) = path {
            self.socket_path = path;
        }
        self
    }
}
