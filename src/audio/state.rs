//! Atomic playback state for one narration slot.
//!
//! The phase and a generation counter share one `AtomicU64` so a completion
//! signal can only end the playback it belongs to. Layout: generation in the
//! upper 62 bits, phase in bits 1..0.

use std::sync::atomic::{AtomicU64, Ordering};

/// Playback phase of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Nothing is playing; `start` will be accepted.
    Idle,
    /// Claimed by a caller still producing its audio. Rejects `start` like
    /// `Playing`, but nothing has been handed to the output yet.
    Reserved,
    /// A buffer is playing; `start` is rejected until it finishes.
    Playing,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Reserved => write!(f, "reserved"),
            Self::Playing => write!(f, "playing"),
        }
    }
}

const PHASE_BITS: u32 = 2;
const PHASE_MASK: u64 = 0b11;

fn pack(generation: u64, state: PlaybackState) -> u64 {
    let phase = match state {
        PlaybackState::Idle => 0,
        PlaybackState::Reserved => 1,
        PlaybackState::Playing => 2,
    };
    (generation << PHASE_BITS) | phase
}

fn phase(word: u64) -> PlaybackState {
    match word & PHASE_MASK {
        0 => PlaybackState::Idle,
        1 => PlaybackState::Reserved,
        _ => PlaybackState::Playing,
    }
}

fn generation(word: u64) -> u64 {
    word >> PHASE_BITS
}

/// Thread-safe `Idle -> [Reserved ->] Playing -> Idle` machine.
#[derive(Debug, Default)]
pub struct SessionState {
    word: AtomicU64,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    pub fn current(&self) -> PlaybackState {
        phase(self.word.load(Ordering::Acquire))
    }

    /// Generation of the most recent reservation or start.
    pub fn generation(&self) -> u64 {
        generation(self.word.load(Ordering::Acquire))
    }

    /// Move out of Idle into `next` under a fresh generation.
    fn claim(&self, next: PlaybackState) -> Option<u64> {
        let current = self.word.load(Ordering::Acquire);
        if phase(current) != PlaybackState::Idle {
            return None;
        }
        let next_gen = generation(current).wrapping_add(1) & (u64::MAX >> PHASE_BITS);
        self.word
            .compare_exchange(
                current,
                pack(next_gen, next),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .ok()
            .map(|_| next_gen)
    }

    fn transition(&self, generation: u64, from: PlaybackState, to: PlaybackState) -> bool {
        self.word
            .compare_exchange(
                pack(generation, from),
                pack(generation, to),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Idle -> Playing. Returns the new generation, or `None` if the slot is
    /// reserved or playing.
    pub fn try_begin(&self) -> Option<u64> {
        self.claim(PlaybackState::Playing)
    }

    /// Idle -> Reserved. Returns the generation the later
    /// [`begin_reserved`](Self::begin_reserved) must present.
    pub fn try_reserve(&self) -> Option<u64> {
        self.claim(PlaybackState::Reserved)
    }

    /// Reserved -> Playing, keeping the reservation's generation.
    /// Fails if the reservation was released or stopped in the meantime.
    pub fn begin_reserved(&self, generation: u64) -> bool {
        self.transition(generation, PlaybackState::Reserved, PlaybackState::Playing)
    }

    /// Reserved -> Idle, only if `generation` still holds the reservation.
    pub fn release(&self, generation: u64) -> bool {
        self.transition(generation, PlaybackState::Reserved, PlaybackState::Idle)
    }

    /// Playing -> Idle, only if `generation` is still the active playback.
    /// Returns `true` if this call performed the transition.
    pub fn finish(&self, generation: u64) -> bool {
        self.transition(generation, PlaybackState::Playing, PlaybackState::Idle)
    }

    /// Force the slot back to Idle from whichever phase it is in.
    /// Returns the generation that was ended and the phase it was in.
    pub fn stop(&self) -> Option<(u64, PlaybackState)> {
        let current = self.word.load(Ordering::Acquire);
        let active = generation(current);
        match phase(current) {
            PlaybackState::Idle => None,
            PlaybackState::Reserved => self
                .release(active)
                .then_some((active, PlaybackState::Reserved)),
            PlaybackState::Playing => self
                .finish(active)
                .then_some((active, PlaybackState::Playing)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_idle() {
        let state = SessionState::new();
        assert_eq!(state.current(), PlaybackState::Idle);
        assert_eq!(state.generation(), 0);
    }

    #[test]
    fn test_begin_rejects_while_playing() {
        let state = SessionState::new();
        assert_eq!(state.try_begin(), Some(1));
        assert_eq!(state.current(), PlaybackState::Playing);
        assert_eq!(state.try_begin(), None);
        assert_eq!(state.generation(), 1);
    }

    #[test]
    fn test_finish_only_matching_generation() {
        let state = SessionState::new();
        let first = state.try_begin().unwrap();
        assert!(state.finish(first));
        assert!(!state.finish(first));

        let second = state.try_begin().unwrap();
        assert_eq!(second, 2);
        // A stale completion from the first playback must not end the second.
        assert!(!state.finish(first));
        assert_eq!(state.current(), PlaybackState::Playing);
        assert!(state.finish(second));
        assert_eq!(state.current(), PlaybackState::Idle);
    }

    #[test]
    fn test_stop() {
        let state = SessionState::new();
        assert_eq!(state.stop(), None);
        let active = state.try_begin().unwrap();
        assert_eq!(state.stop(), Some((active, PlaybackState::Playing)));
        assert_eq!(state.stop(), None);
        assert!(!state.finish(active));
    }

    #[test]
    fn test_reservation_blocks_begin() {
        let state = SessionState::new();
        let reserved = state.try_reserve().unwrap();
        assert_eq!(state.current(), PlaybackState::Reserved);
        assert_eq!(state.try_begin(), None);
        assert_eq!(state.try_reserve(), None);

        assert!(state.begin_reserved(reserved));
        assert_eq!(state.current(), PlaybackState::Playing);
        assert_eq!(state.generation(), reserved);
        // Consumed: a late release is a no-op.
        assert!(!state.release(reserved));
        assert!(state.finish(reserved));
        assert_eq!(state.current(), PlaybackState::Idle);
    }

    #[test]
    fn test_release_and_stop_reservation() {
        let state = SessionState::new();
        let first = state.try_reserve().unwrap();
        assert!(state.release(first));
        assert_eq!(state.current(), PlaybackState::Idle);
        assert!(!state.begin_reserved(first));

        let second = state.try_reserve().unwrap();
        assert_eq!(second, 2);
        assert_eq!(state.stop(), Some((second, PlaybackState::Reserved)));
        assert!(!state.begin_reserved(second));
        assert_eq!(state.current(), PlaybackState::Idle);
    }

    #[test]
    fn test_display() {
        assert_eq!(PlaybackState::Idle.to_string(), "idle");
        assert_eq!(PlaybackState::Reserved.to_string(), "reserved");
        assert_eq!(PlaybackState::Playing.to_string(), "playing");
    }
}
