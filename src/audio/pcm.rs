//! 16-bit signed little-endian PCM to normalized f32.

/// Full-scale divisor for i16 samples. Output lands in [-1.0, 1.0).
const I16_SCALE: f32 = 32768.0;

/// Reinterpret raw bytes as i16 samples, low byte first.
///
/// A trailing odd byte cannot form a sample and is dropped.
pub fn samples_i16(bytes: &[u8]) -> impl ExactSizeIterator<Item = i16> + '_ {
    if bytes.len() % 2 != 0 {
        tracing::debug!(len = bytes.len(), "Odd-length PCM payload, dropping trailing byte");
    }
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
}

/// Map one sample to [-1.0, 1.0).
#[inline]
pub fn to_f32(sample: i16) -> f32 {
    sample as f32 / I16_SCALE
}

/// Normalize raw PCM bytes into f32 samples.
///
/// Lazy and exact-sized so the buffer builder can allocate once.
pub fn normalize(bytes: &[u8]) -> impl ExactSizeIterator<Item = f32> + '_ {
    samples_i16(bytes).map(to_f32)
}
