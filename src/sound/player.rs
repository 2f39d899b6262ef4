//! Sound player implementation using rodio.
//!
//! rodio's `OutputStream` is not `Send`, so the stream lives on a dedicated
//! audio thread and the player only holds a channel into it.

use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use rodio::source::{SineWave, Source, Zero};
use rodio::{OutputStream, Sink};
use tracing::{debug, warn};

use super::error::SoundError;
use super::tone::ToneSpec;
use super::SoundPlayer;
use crate::types::Phase;

/// Pending chimes beyond this are dropped.
const QUEUE_CAPACITY: usize = 4;

const SAMPLE_RATE: u32 = 48_000;

/// A sound player that synthesizes phase-change chimes with rodio.
pub struct RodioSoundPlayer {
    requests: Sender<Phase>,
}

impl RodioSoundPlayer {
    /// Starts the audio thread and opens the default output device.
    ///
    /// # Errors
    ///
    /// Returns `SoundError::DeviceNotAvailable` if no audio output device
    /// is available.
    pub fn new() -> Result<Self, SoundError> {
        let (requests, inbox) = bounded::<Phase>(QUEUE_CAPACITY);
        let (ready_tx, ready_rx) = bounded::<Result<(), SoundError>>(1);

        thread::Builder::new()
            .name("pomobar-audio".to_string())
            .spawn(move || audio_thread(inbox, ready_tx))
            .map_err(|e| SoundError::StreamError(e.to_string()))?;

        ready_rx
            .recv()
            .map_err(|e| SoundError::StreamError(e.to_string()))??;

        debug!("Audio output stream initialized");
        Ok(Self { requests })
    }
}

impl SoundPlayer for RodioSoundPlayer {
    fn play_phase_change_sound(&self, completed: Phase) -> Result<(), SoundError> {
        match self.requests.try_send(completed) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(SoundError::PlaybackError(
                "too many chimes queued".to_string(),
            )),
            Err(TrySendError::Disconnected(_)) => Err(SoundError::PlaybackError(
                "audio thread has stopped".to_string(),
            )),
        }
    }

    fn is_available(&self) -> bool {
        true
    }
}

fn audio_thread(inbox: Receiver<Phase>, ready: Sender<Result<(), SoundError>>) {
    let (_stream, handle) = match OutputStream::try_default() {
        Ok(pair) => pair,
        Err(e) => {
            let _ = ready.send(Err(SoundError::DeviceNotAvailable(e.to_string())));
            return;
        }
    };
    let _ = ready.send(Ok(()));

    // Exits when the player is dropped.
    while let Ok(completed) = inbox.recv() {
        let sink = match Sink::try_new(&handle) {
            Ok(sink) => sink,
            Err(e) => {
                warn!(error = %e, "Failed to open audio sink");
                continue;
            }
        };

        let tone = ToneSpec::for_completed(completed);
        for (i, frequency) in tone.frequencies.iter().enumerate() {
            if i > 0 {
                sink.append(silence(tone.gap));
            }
            sink.append(
                SineWave::new(*frequency)
                    .take_duration(tone.note)
                    .amplify(tone.volume),
            );
        }
        debug!(
            phase = completed.as_str(),
            duration_ms = tone.total_duration().as_millis() as u64,
            "Playing phase-change chime"
        );
        sink.detach();
    }
}

fn silence(duration: Duration) -> impl Source<Item = f32> + Send + 'static {
    Zero::<f32>::new(1, SAMPLE_RATE).take_duration(duration)
}
