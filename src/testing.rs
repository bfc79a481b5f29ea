//! Test doubles for the audio output and the synthesis service.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::audio::{AudioBuffer, CHANNELS, SAMPLE_RATE};
use crate::playback::{AudioOutput, CompletionCallback, PlaybackError, PlaybackHandle};
use crate::synth::{SpeechSynthesizer, SynthesisError};

pub fn buffer_of(samples: &[f32]) -> AudioBuffer {
    AudioBuffer::build(samples.iter().copied(), SAMPLE_RATE, CHANNELS, usize::MAX).unwrap()
}

struct FakePlayback {
    buffer: AudioBuffer,
    handle: PlaybackHandle,
    on_complete: Option<CompletionCallback>,
}

/// Records every buffer it is asked to play. Completion is driven by the
/// test through [`FakeOutput::complete`].
#[derive(Default)]
pub struct FakeOutput {
    plays: Mutex<Vec<FakePlayback>>,
    fail_next: AtomicBool,
    complete_immediately: AtomicBool,
}

impl FakeOutput {
    /// Make the next `play` fail with a device error.
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Fire completion inside `play`, before it returns.
    pub fn complete_immediately(&self) {
        self.complete_immediately.store(true, Ordering::SeqCst);
    }

    pub fn play_count(&self) -> usize {
        self.plays.lock().unwrap().len()
    }

    pub fn buffer(&self, index: usize) -> AudioBuffer {
        self.plays.lock().unwrap()[index].buffer.clone()
    }

    pub fn was_cancelled(&self, index: usize) -> bool {
        self.plays.lock().unwrap()[index].handle.is_cancelled()
    }

    /// Invoke the completion callback of playback `index`, as the backend
    /// would when the buffer drains. Returns `false` if already fired.
    pub fn complete(&self, index: usize) -> bool {
        let callback = self.plays.lock().unwrap()[index].on_complete.take();
        match callback {
            Some(cb) => {
                cb();
                true
            }
            None => false,
        }
    }
}

impl AudioOutput for FakeOutput {
    fn play(
        &self,
        buffer: AudioBuffer,
        on_complete: CompletionCallback,
    ) -> Result<PlaybackHandle, PlaybackError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(PlaybackError::Device("fake device unavailable".into()));
        }
        let handle = PlaybackHandle::new();
        let mut pending = Some(on_complete);
        let stored = if self.complete_immediately.load(Ordering::SeqCst) {
            None
        } else {
            pending.take()
        };
        self.plays.lock().unwrap().push(FakePlayback {
            buffer,
            handle: handle.clone(),
            on_complete: stored,
        });
        if let Some(cb) = pending {
            cb();
        }
        Ok(handle)
    }

    fn cancel(&self, handle: &PlaybackHandle) {
        handle.cancel();
    }
}

/// Returns a fixed payload, optionally after a delay, and counts calls.
pub struct FakeSynthesizer {
    response: Result<Option<String>, String>,
    delay: Duration,
    calls: AtomicUsize,
}

impl FakeSynthesizer {
    fn with_response(response: Result<Option<String>, String>) -> Self {
        Self {
            response,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn returning(payload: &str) -> Self {
        Self::with_response(Ok(Some(payload.to_string())))
    }

    pub fn empty() -> Self {
        Self::with_response(Ok(None))
    }

    pub fn failing(message: &str) -> Self {
        Self::with_response(Err(message.to_string()))
    }

    /// Resolve each call only after `delay`, like a slow remote service.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SpeechSynthesizer for FakeSynthesizer {
    fn synthesize(
        &self,
        _text: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>, SynthesisError>> + Send + '_>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let response = self
            .response
            .clone()
            .map_err(SynthesisError::Service);
        let delay = self.delay;
        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            response
        })
    }

    fn name(&self) -> String {
        "Fake".to_string()
    }
}
