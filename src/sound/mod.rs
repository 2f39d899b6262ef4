//! Sound playback for phase changes.
//!
//! The engine calls [`SoundPlayer::play_phase_change_sound`] once per
//! natural phase completion. Playback is fire-and-forget: the call only
//! queues the chime and failures are logged by the caller.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   crossbeam    ┌──────────────────┐
//! │ RodioSoundPlayer │ ─────────────▶ │   audio thread   │
//! │  (engine side)   │     Phase      │ OutputStream/Sink│
//! └──────────────────┘                └──────────────────┘
//! ```
//!
//! # Feature Flags
//!
//! Real playback comes from the `audio` feature (rodio + crossbeam-channel),
//! which is on by default. Builds with `--no-default-features` always get a
//! [`SilentSoundPlayer`].

mod error;
#[cfg(feature = "audio")]
mod player;
mod tone;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::debug;

pub use error::SoundError;
#[cfg(feature = "audio")]
pub use player::RodioSoundPlayer;
pub use tone::ToneSpec;

use crate::types::Phase;

/// Trait for sound playback implementations.
pub trait SoundPlayer: Send {
    /// Queues the chime for the phase that just completed.
    ///
    /// Must not block on playback.
    fn play_phase_change_sound(&self, completed: Phase) -> Result<(), SoundError>;

    /// Returns true if the audio system is available.
    fn is_available(&self) -> bool;
}

impl<T: SoundPlayer + Sync + ?Sized> SoundPlayer for Arc<T> {
    fn play_phase_change_sound(&self, completed: Phase) -> Result<(), SoundError> {
        (**self).play_phase_change_sound(completed)
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }
}

/// Player used when sound is disabled or no device is present.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentSoundPlayer;

impl SoundPlayer for SilentSoundPlayer {
    fn play_phase_change_sound(&self, completed: Phase) -> Result<(), SoundError> {
        debug!(phase = completed.as_str(), "Sound disabled, skipping chime");
        Ok(())
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// Creates the best available player.
///
/// Falls back to [`SilentSoundPlayer`] when sound is disabled, the device
/// cannot be opened, or the crate was built without the default `audio`
/// feature.
pub fn try_create_player(enabled: bool) -> Box<dyn SoundPlayer> {
    if !enabled {
        return Box::new(SilentSoundPlayer);
    }

    #[cfg(feature = "audio")]
    {
        match RodioSoundPlayer::new() {
            Ok(player) => return Box::new(player),
            Err(e) => {
                tracing::warn!(error = %e, suggestion = e.suggestion(), "Sound unavailable");
            }
        }
    }

    Box::new(SilentSoundPlayer)
}

/// Mock sound player for testing.
#[derive(Debug)]
pub struct MockSoundPlayer {
    play_calls: Mutex<Vec<Phase>>,
    should_fail: AtomicBool,
}

impl Default for MockSoundPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSoundPlayer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            play_calls: Mutex::new(Vec::new()),
            should_fail: AtomicBool::new(false),
        }
    }

    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::SeqCst);
    }

    #[must_use]
    pub fn play_count(&self) -> usize {
        self.calls().len()
    }

    /// Phases whose completion chime was requested, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Phase> {
        match self.play_calls.lock() {
            Ok(calls) => calls.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl SoundPlayer for MockSoundPlayer {
    fn play_phase_change_sound(&self, completed: Phase) -> Result<(), SoundError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(SoundError::PlaybackError("Mock failure".to_string()));
        }
        if let Ok(mut calls) = self.play_calls.lock() {
            calls.push(completed);
        }
        Ok(())
    }

    fn is_available(&self) -> bool {
        true
    }
}
