//! Narration playback core.
//!
//! Decodes base64 speech payloads (24kHz mono i16 little-endian PCM) into
//! playable buffers and plays them through per-slot sessions that allow one
//! narration at a time on each UI surface.

pub mod audio;
pub mod config;
pub mod ipc;
pub mod narrator;
pub mod playback;
pub mod slot;
pub mod synth;

#[cfg(test)]
mod testing;

pub use narrator::{NarrationError, NarrationOutcome, Narrator};
pub use slot::SlotId;
