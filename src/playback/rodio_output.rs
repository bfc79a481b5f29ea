//! Rodio playback backend.
//!
//! Each playback gets its own thread: rodio's `OutputStream` is not `Send`,
//! so the stream is opened, drained and dropped on that thread.

use std::sync::mpsc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait};
use rodio::{OutputStream, OutputStreamHandle, Sink};

use super::{AudioOutput, CompletionCallback, PlaybackError, PlaybackHandle};
use crate::audio::AudioBuffer;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Plays buffers on a named or default output device.
#[derive(Debug, Clone)]
pub struct RodioOutput {
    device_name: Option<String>,
    volume: f32,
}

impl RodioOutput {
    /// `volume` is clamped to [0.0, 2.0]; 1.0 is unity gain.
    pub fn new(device_name: Option<String>, volume: f32) -> Self {
        Self {
            device_name,
            volume: volume.clamp(0.0, 2.0),
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }
}

impl Default for RodioOutput {
    fn default() -> Self {
        Self::new(None, 1.0)
    }
}

impl AudioOutput for RodioOutput {
    fn play(
        &self,
        buffer: AudioBuffer,
        on_complete: CompletionCallback,
    ) -> Result<PlaybackHandle, PlaybackError> {
        let handle = PlaybackHandle::new();
        let thread_handle = handle.clone();
        let device_name = self.device_name.clone();
        let volume = self.volume;
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), PlaybackError>>();

        std::thread::Builder::new()
            .name("narration-playback".into())
            .spawn(move || {
                let (_stream, sink) = match open_sink(device_name.as_deref()) {
                    Ok(opened) => {
                        let _ = ready_tx.send(Ok(()));
                        opened
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                // Fires on return and on unwind alike.
                let _complete = CompleteOnDrop::new(on_complete);
                play_until_done(&sink, buffer, volume, &thread_handle);
            })
            .map_err(|e| PlaybackError::Device(format!("Failed to spawn playback thread: {}", e)))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(handle),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(PlaybackError::Device(
                "Playback thread exited before opening the device".into(),
            )),
        }
    }

    fn cancel(&self, handle: &PlaybackHandle) {
        handle.cancel();
    }
}

/// Runs the completion callback when dropped, so a panicking playback
/// thread still returns its slot to Idle.
struct CompleteOnDrop(Option<CompletionCallback>);

impl CompleteOnDrop {
    fn new(on_complete: CompletionCallback) -> Self {
        Self(Some(on_complete))
    }
}

impl Drop for CompleteOnDrop {
    fn drop(&mut self) {
        if let Some(on_complete) = self.0.take() {
            on_complete();
        }
    }
}

/// Block until the sink drains or the handle is cancelled.
fn play_until_done(sink: &Sink, buffer: AudioBuffer, volume: f32, handle: &PlaybackHandle) {
    sink.set_volume(volume);

    let sample_rate = buffer.sample_rate();
    let channels = buffer.channels();
    let source = rodio::buffer::SamplesBuffer::new(channels, sample_rate, buffer.into_samples());
    sink.append(source);

    while !sink.empty() {
        if handle.is_cancelled() {
            tracing::info!("Narration playback cancelled");
            sink.stop();
            return;
        }
        std::thread::sleep(POLL_INTERVAL);
    }
    sink.sleep_until_end();
}

fn open_sink(output_device_name: Option<&str>) -> Result<(OutputStream, Sink), PlaybackError> {
    let (stream, stream_handle) = open_output_stream(output_device_name)?;
    let sink = Sink::try_new(&stream_handle)
        .map_err(|e| PlaybackError::Device(format!("Failed to create audio sink: {}", e)))?;
    Ok((stream, sink))
}

/// Open the audio output stream for a named or default device.
fn open_output_stream(
    output_device_name: Option<&str>,
) -> Result<(OutputStream, OutputStreamHandle), PlaybackError> {
    let Some(name) = output_device_name else {
        return open_default_stream();
    };

    let host = cpal::default_host();
    let device = host
        .output_devices()
        .map_err(|e| PlaybackError::Device(format!("Failed to enumerate output devices: {}", e)))?
        .find(|d| d.name().map(|n| n == name).unwrap_or(false));

    match device {
        Some(dev) => {
            tracing::info!(device = %name, "Using configured output device");
            OutputStream::try_from_device(&dev).map_err(|e| {
                PlaybackError::Device(format!("Failed to open output device '{}': {}", name, e))
            })
        }
        None => {
            tracing::warn!(
                device = %name,
                "Configured output device not found, falling back to default"
            );
            open_default_stream()
        }
    }
}

fn open_default_stream() -> Result<(OutputStream, OutputStreamHandle), PlaybackError> {
    OutputStream::try_default()
        .map_err(|e| PlaybackError::Device(format!("No audio output device available: {}", e)))
}

/// Names of the host's output devices.
pub fn list_output_devices() -> anyhow::Result<Vec<String>> {
    let host = cpal::default_host();
    let devices = host
        .output_devices()
        .map_err(|e| anyhow::anyhow!("Failed to enumerate output devices: {}", e))?
        .filter_map(|d| d.name().ok())
        .collect();
    Ok(devices)
}
