//! Daily work-session counting with a calendar-day rollover.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::fsutil::atomic_write;

// ============================================================================
// Clock
// ============================================================================

/// Source of the current calendar date.
pub trait Clock: Send {
    fn today(&self) -> NaiveDate;
}

/// Local wall-clock date.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A settable date, shared between clones.
#[derive(Debug, Clone)]
pub struct FixedClock {
    date: Arc<Mutex<NaiveDate>>,
}

impl FixedClock {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date: Arc::new(Mutex::new(date)),
        }
    }

    pub fn set(&self, date: NaiveDate) {
        if let Ok(mut guard) = self.date.lock() {
            *guard = date;
        }
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        match self.date.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

// ============================================================================
// SessionStore
// ============================================================================

/// Errors from the durable session counter store.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to read session store {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write session store {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("corrupt session store {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Completed work sessions on one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    pub count: u32,
    pub date: NaiveDate,
}

impl DailyCount {
    pub fn new(count: u32, date: NaiveDate) -> Self {
        Self { count, date }
    }
}

/// Durable storage for the daily session counter.
pub trait SessionStore: Send {
    /// Returns the stored count, or `None` if nothing was stored yet.
    fn read_today_count(&self) -> Result<Option<DailyCount>, PersistenceError>;

    fn write_today_count(&self, value: &DailyCount) -> Result<(), PersistenceError>;
}

/// Stores the counter as a small JSON file.
#[derive(Debug, Clone)]
pub struct JsonSessionStore {
    path: PathBuf,
}

impl JsonSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for JsonSessionStore {
    fn read_today_count(&self) -> Result<Option<DailyCount>, PersistenceError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(PersistenceError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|source| PersistenceError::Decode {
                path: self.path.clone(),
                source,
            })
    }

    fn write_today_count(&self, value: &DailyCount) -> Result<(), PersistenceError> {
        let write_error = |source: io::Error| PersistenceError::Write {
            path: self.path.clone(),
            source,
        };
        let json = serde_json::to_vec_pretty(value).map_err(|e| write_error(e.into()))?;
        atomic_write(&self.path, &json).map_err(write_error)
    }
}

/// In-memory store, shared between clones. Failures can be switched on for tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    inner: Arc<Mutex<MemoryStoreState>>,
}

#[derive(Debug, Default)]
struct MemoryStoreState {
    value: Option<DailyCount>,
    fail_reads: bool,
    fail_writes: bool,
    writes: usize,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(value: DailyCount) -> Self {
        let store = Self::default();
        store.lock().value = Some(value);
        store
    }

    pub fn value(&self) -> Option<DailyCount> {
        self.lock().value
    }

    /// Number of successful writes.
    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.lock().fail_reads = fail;
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryStoreState> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn simulated_failure(kind: &str) -> io::Error {
        io::Error::new(io::ErrorKind::Other, format!("simulated {kind} failure"))
    }
}

impl SessionStore for MemorySessionStore {
    fn read_today_count(&self) -> Result<Option<DailyCount>, PersistenceError> {
        let state = self.lock();
        if state.fail_reads {
            return Err(PersistenceError::Read {
                path: PathBuf::from("<memory>"),
                source: Self::simulated_failure("read"),
            });
        }
        Ok(state.value)
    }

    fn write_today_count(&self, value: &DailyCount) -> Result<(), PersistenceError> {
        let mut state = self.lock();
        if state.fail_writes {
            return Err(PersistenceError::Write {
                path: PathBuf::from("<memory>"),
                source: Self::simulated_failure("write"),
            });
        }
        state.value = Some(*value);
        state.writes += 1;
        Ok(())
    }
}

// ============================================================================
// SessionTracker
// ============================================================================

/// Counts completed work sessions for the current calendar day.
///
/// Whenever the stored date is not today, the count is reset to zero and
/// persisted before anything else happens. Store failures are logged and
/// the tracker keeps counting in memory.
pub struct SessionTracker {
    store: Box<dyn SessionStore>,
    clock: Box<dyn Clock>,
    current: DailyCount,
}

impl SessionTracker {
    /// Loads the persisted count, falling back to zero for today on failure.
    pub fn load(store: Box<dyn SessionStore>, clock: Box<dyn Clock>) -> Self {
        let today = clock.today();
        let current = match store.read_today_count() {
            Ok(Some(value)) => value,
            Ok(None) => DailyCount::new(0, today),
            Err(e) => {
                warn!(error = %e, "Failed to read session count, starting from zero");
                DailyCount::new(0, today)
            }
        };
        debug!(count = current.count, date = %current.date, "Loaded session count");

        Self {
            store,
            clock,
            current,
        }
    }

    /// Creates a tracker backed by a fresh in-memory store and the system clock.
    pub fn in_memory() -> Self {
        Self::load(Box::new(MemorySessionStore::new()), Box::new(SystemClock))
    }

    /// Completed work sessions today.
    pub fn today_count(&mut self) -> u32 {
        self.roll_over();
        self.current.count
    }

    /// Records one completed work session and returns today's new count.
    pub fn record_completion(&mut self) -> u32 {
        self.roll_over();
        self.current.count += 1;
        self.persist();
        self.current.count
    }

    /// Date of the last recorded (or rolled-over) count.
    pub fn last_session_date(&self) -> NaiveDate {
        self.current.date
    }

    /// Resets and persists a zero count when the day has changed.
    ///
    /// Returns true if the stored date was not today.
    pub fn roll_over(&mut self) -> bool {
        let today = self.clock.today();
        if self.current.date == today {
            return false;
        }
        debug!(
            previous_date = %self.current.date,
            previous_count = self.current.count,
            "New day, resetting session count"
        );
        self.current = DailyCount::new(0, today);
        self.persist();
        true
    }

    fn persist(&self) {
        if let Err(e) = self.store.write_today_count(&self.current) {
            warn!(error = %e, "Failed to persist session count");
        }
    }
}

impl std::fmt::Debug for SessionTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTracker")
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}
