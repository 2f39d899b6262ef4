//! Sleep prevention while the countdown runs.
//!
//! A [`SleepToken`] is held exactly while the timer is running. The real
//! inhibitor keeps a helper process alive for the lifetime of the token:
//!
//! - macOS: `caffeinate -i -w <pid>`
//! - Linux: `systemd-inhibit --what=idle:sleep ... sleep infinity`
//!
//! Killing the helper lifts the inhibition. `caffeinate -w` also exits on
//! its own if the daemon dies without releasing.

pub mod error;

use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

pub use self::error::SleepInhibitError;

use crate::fsutil::find_in_path;

static NEXT_TOKEN_ID: AtomicU64 = AtomicU64::new(1);

// ============================================================================
// SleepToken
// ============================================================================

/// Proof that sleep prevention is active.
///
/// Releasing is idempotent. A token dropped without an explicit release
/// still stops its helper process.
#[derive(Debug)]
pub struct SleepToken {
    id: u64,
    helper: Option<Child>,
}

impl SleepToken {
    fn new(helper: Option<Child>) -> Self {
        Self {
            id: NEXT_TOKEN_ID.fetch_add(1, Ordering::Relaxed),
            helper,
        }
    }

    /// A token with no backing process.
    pub fn detached() -> Self {
        Self::new(None)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Stops the helper process. Later calls do nothing.
    pub fn release(&mut self) {
        let Some(mut helper) = self.helper.take() else {
            return;
        };
        if let Err(e) = helper.kill() {
            debug!(token = self.id, error = %e, "Sleep inhibitor already gone");
        }
        // Reap so the helper does not linger as a zombie.
        let _ = helper.wait();
        debug!(token = self.id, "Sleep prevention released");
    }

    pub fn is_released(&self) -> bool {
        self.helper.is_none()
    }
}

impl Drop for SleepToken {
    fn drop(&mut self) {
        self.release();
    }
}

// ============================================================================
// SleepInhibitor
// ============================================================================

/// Scoped system resource that keeps the machine awake.
pub trait SleepInhibitor: Send {
    fn acquire(&self, reason: &str) -> Result<SleepToken, SleepInhibitError>;

    fn release(&self, token: SleepToken);
}

impl<T: SleepInhibitor + Sync + ?Sized> SleepInhibitor for Arc<T> {
    fn acquire(&self, reason: &str) -> Result<SleepToken, SleepInhibitError> {
        (**self).acquire(reason)
    }

    fn release(&self, token: SleepToken) {
        (**self).release(token)
    }
}

/// Inhibits sleep by keeping a platform helper process alive.
#[derive(Debug, Clone)]
pub struct ProcessSleepInhibitor {
    program: std::path::PathBuf,
}

impl ProcessSleepInhibitor {
    #[cfg(target_os = "macos")]
    const PROGRAM: &'static str = "caffeinate";
    #[cfg(not(target_os = "macos"))]
    const PROGRAM: &'static str = "systemd-inhibit";

    /// Looks for the platform helper on `PATH`.
    pub fn detect() -> Result<Self, SleepInhibitError> {
        let program =
            find_in_path(Self::PROGRAM).ok_or(SleepInhibitError::NotAvailable(Self::PROGRAM))?;
        Ok(Self { program })
    }

    fn command(&self, reason: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        if cfg!(target_os = "macos") {
            cmd.arg("-i").arg("-w").arg(std::process::id().to_string());
        } else {
            cmd.arg("--what=idle:sleep")
                .arg("--who=pomobar")
                .arg(format!("--why={reason}"))
                .arg("--mode=block")
                .arg("sleep")
                .arg("infinity");
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        cmd
    }
}

impl SleepInhibitor for ProcessSleepInhibitor {
    fn acquire(&self, reason: &str) -> Result<SleepToken, SleepInhibitError> {
        let mut child = self.command(reason).spawn()?;
        if let Ok(Some(status)) = child.try_wait() {
            return Err(SleepInhibitError::ExitedEarly(status.to_string()));
        }
        let token = SleepToken::new(Some(child));
        debug!(token = token.id(), reason, "Sleep prevention acquired");
        Ok(token)
    }

    fn release(&self, mut token: SleepToken) {
        token.release();
    }
}

/// Inhibitor used when sleep prevention is disabled or unsupported.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSleepInhibitor;

impl SleepInhibitor for NoopSleepInhibitor {
    fn acquire(&self, _reason: &str) -> Result<SleepToken, SleepInhibitError> {
        Ok(SleepToken::detached())
    }

    fn release(&self, _token: SleepToken) {}
}

/// Creates the inhibitor for the daemon, degrading to [`NoopSleepInhibitor`].
pub fn try_create_inhibitor(enabled: bool) -> Box<dyn SleepInhibitor> {
    if !enabled {
        return Box::new(NoopSleepInhibitor);
    }
    match ProcessSleepInhibitor::detect() {
        Ok(inhibitor) => Box::new(inhibitor),
        Err(e) => {
            warn!(error = %e, "Sleep prevention unavailable");
            Box::new(NoopSleepInhibitor)
        }
    }
}

/// Mock inhibitor for testing. Counts acquisitions and releases.
#[derive(Debug, Default)]
pub struct MockSleepInhibitor {
    acquired: AtomicUsize,
    released: AtomicUsize,
    should_fail: AtomicBool,
}

impl MockSleepInhibitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::SeqCst);
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Tokens currently held.
    pub fn active(&self) -> usize {
        self.acquired().saturating_sub(self.released())
    }
}

impl SleepInhibitor for MockSleepInhibitor {
    fn acquire(&self, _reason: &str) -> Result<SleepToken, SleepInhibitError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(SleepInhibitError::NotAvailable("mock"));
        }
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(SleepToken::detached())
    }

    fn release(&self, _token: SleepToken) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}
