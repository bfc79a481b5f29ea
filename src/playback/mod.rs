//! Audio output backends and per-slot playback sessions.
//!
//! Platform playback sits behind [`AudioOutput`] so sessions can be driven
//! by a fake in tests. [`RodioOutput`] is the real device backend.

pub mod rodio_output;
pub mod session;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::audio::AudioBuffer;

pub use rodio_output::{list_output_devices, RodioOutput};
pub use session::{FinishReason, PlaybackSession, Reservation, SessionEvent};

/// Invoked by the backend when a playback ends, whether it drained or was
/// cancelled.
pub type CompletionCallback = Box<dyn FnOnce() + Send + 'static>;

/// Errors from starting playback.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlaybackError {
    /// The slot is already playing. Not a fault, the request is dropped.
    #[error("playback already in progress")]
    Busy,
    /// The slot's reservation was cancelled before its audio was ready.
    #[error("reservation cancelled before playback")]
    Cancelled,
    /// The output device could not be opened or refused the buffer.
    #[error("audio output error: {0}")]
    Device(String),
}

/// Handle to one in-flight playback on a backend.
#[derive(Debug, Clone, Default)]
pub struct PlaybackHandle {
    cancelled: Arc<AtomicBool>,
}

impl PlaybackHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that the backend halt this playback.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Something that can play a finished buffer and report completion.
pub trait AudioOutput: Send + Sync {
    /// Start playing `buffer`. `on_complete` must be called exactly once
    /// when playback ends, unless this returns an error.
    fn play(
        &self,
        buffer: AudioBuffer,
        on_complete: CompletionCallback,
    ) -> Result<PlaybackHandle, PlaybackError>;

    /// Halt a playback started by this backend. Must not block.
    fn cancel(&self, handle: &PlaybackHandle);
}
