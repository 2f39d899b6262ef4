//! Hook for bringing an attached UI to the front.
//!
//! The daemon has no window of its own; `raise` is forwarded to whatever
//! front end is attached. Without one the request is only logged.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::info;

/// Brings the UI forward.
pub trait UiRaiser: Send {
    fn raise(&self);
}

impl<T: UiRaiser + Sync + ?Sized> UiRaiser for Arc<T> {
    fn raise(&self) {
        (**self).raise()
    }
}

/// Raiser used when no UI is attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogRaiser;

impl UiRaiser for LogRaiser {
    fn raise(&self) {
        info!("Raise requested, no UI attached");
    }
}

/// Mock raiser for testing.
#[derive(Debug, Default)]
pub struct MockRaiser {
    raised: AtomicUsize,
}

impl MockRaiser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise_count(&self) -> usize {
        self.raised.load(Ordering::SeqCst)
    }
}

impl UiRaiser for MockRaiser {
    fn raise(&self) {
        self.raised.fetch_add(1, Ordering::SeqCst);
    }
}
