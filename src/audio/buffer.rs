//! Fixed-rate audio buffer construction.

/// The buffer could not be built.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocationError {
    #[error("cannot allocate an empty audio buffer")]
    Empty,
    #[error("invalid buffer format: {sample_rate} Hz, {channels} channel(s)")]
    InvalidFormat { sample_rate: u32, channels: u16 },
    #[error("audio buffer of {requested} samples exceeds limit of {limit}")]
    TooLong { requested: usize, limit: usize },
    #[error("out of memory allocating {requested} samples")]
    OutOfMemory { requested: usize },
}

/// Interleaved f32 PCM ready for playback.
///
/// Synthesized speech is mono, so `samples().len()` is the frame count.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

impl AudioBuffer {
    /// Build a buffer with exactly `samples.len()` samples.
    ///
    /// Allocates once. Fails on zero length, zero rate or channels, a
    /// length above `max_samples`, or allocator failure.
    pub fn build<I>(
        samples: I,
        sample_rate: u32,
        channels: u16,
        max_samples: usize,
    ) -> Result<Self, AllocationError>
    where
        I: ExactSizeIterator<Item = f32>,
    {
        if sample_rate == 0 || channels == 0 {
            return Err(AllocationError::InvalidFormat {
                sample_rate,
                channels,
            });
        }

        let requested = samples.len();
        if requested == 0 {
            return Err(AllocationError::Empty);
        }
        if requested > max_samples {
            return Err(AllocationError::TooLong {
                requested,
                limit: max_samples,
            });
        }

        let mut data = Vec::new();
        data.try_reserve_exact(requested)
            .map_err(|_| AllocationError::OutOfMemory { requested })?;
        data.extend(samples);

        Ok(Self {
            samples: data,
            sample_rate,
            channels,
        })
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Playback length in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / (self.sample_rate as f64 * self.channels as f64)
    }

    /// Hand the samples to an output backend.
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }
}

/// Maximum sample count for `seconds` of mono audio at `sample_rate`.
pub fn max_samples_for(seconds: u32, sample_rate: u32) -> usize {
    (seconds as usize).saturating_mul(sample_rate as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_exact_length() {
        let buffer = AudioBuffer::build([0.1f32, -0.2, 0.3].into_iter(), 24_000, 1, 10).unwrap();
        assert_eq!(buffer.samples(), &[0.1, -0.2, 0.3]);
        assert_eq!(buffer.sample_rate(), 24_000);
        assert_eq!(buffer.channels(), 1);
    }

    #[test]
    fn test_build_empty_fails() {
        let err = AudioBuffer::build(std::iter::empty(), 24_000, 1, 10).unwrap_err();
        assert_eq!(err, AllocationError::Empty);
    }

    #[test]
    fn test_build_zero_rate_fails() {
        let err = AudioBuffer::build([0.0f32].into_iter(), 0, 1, 10).unwrap_err();
        assert!(matches!(err, AllocationError::InvalidFormat { .. }));
    }

    #[test]
    fn test_build_over_limit_fails() {
        let err = AudioBuffer::build(vec![0.0f32; 11].into_iter(), 24_000, 1, 10).unwrap_err();
        assert_eq!(
            err,
            AllocationError::TooLong {
                requested: 11,
                limit: 10
            }
        );
    }

    #[test]
    fn test_duration() {
        let buffer = AudioBuffer::build(vec![0.0f32; 12_000].into_iter(), 24_000, 1, usize::MAX)
            .unwrap();
        assert!((buffer.duration_secs() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_max_samples_for() {
        assert_eq!(max_samples_for(600, 24_000), 14_400_000);
    }
}
