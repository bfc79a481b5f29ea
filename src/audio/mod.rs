//! Synthesized audio decoding: base64 payload -> PCM -> playable buffer.
//!
//! The synthesis service returns mono 16-bit signed little-endian PCM at
//! 24kHz with no container header. Nothing in the payload describes that
//! format, so the constants below are the contract.

pub mod buffer;
pub mod decode;
pub mod pcm;
pub mod state;

pub use buffer::{AllocationError, AudioBuffer};
pub use decode::{decode_base64, strip_data_url, DecodeError};
pub use state::{PlaybackState, SessionState};

/// Sample rate of synthesized speech payloads.
pub const SAMPLE_RATE: u32 = 24_000;

/// Synthesized speech is always mono.
pub const CHANNELS: u16 = 1;

/// Default upper bound on a single narration buffer (10 minutes).
pub const DEFAULT_MAX_BUFFER_SECONDS: u32 = 600;

/// Decode a synthesis payload all the way to a playable buffer.
///
/// `max_samples` caps the buffer length; see [`AudioBuffer::build`].
pub fn decode_payload(payload: &str, max_samples: usize) -> Result<AudioBuffer, PayloadError> {
    let bytes = decode_base64(payload)?;
    let samples = pcm::normalize(&bytes);
    let buffer = AudioBuffer::build(samples, SAMPLE_RATE, CHANNELS, max_samples)?;
    Ok(buffer)
}

/// Failure turning a payload into a buffer.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Allocation(#[from] AllocationError),
}
