//! One playback session per narration slot.
//!
//! `Idle --start--> Playing --complete/cancel--> Idle`. A caller that must
//! do slow work before it has a buffer takes a [`Reservation`] first
//! (`Idle -> Reserved`), which `start_reserved` turns into a playback. A
//! `start` while reserved or playing is rejected with
//! [`PlaybackError::Busy`], never queued. Every accepted start produces
//! exactly one [`SessionEvent::Finished`].

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::broadcast;

use super::{AudioOutput, CompletionCallback, PlaybackError, PlaybackHandle};
use crate::audio::{AudioBuffer, PlaybackState, SessionState};
use crate::slot::SlotId;

const EVENT_CAPACITY: usize = 64;

/// Why a playback ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// The backend played the buffer to the end.
    Completed,
    /// `cancel()` halted it.
    Cancelled,
    /// The backend refused the buffer after the session had started.
    Failed,
}

/// Lifecycle notifications, used to drive "currently speaking" indicators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Started {
        slot: SlotId,
        generation: u64,
    },
    Finished {
        slot: SlotId,
        generation: u64,
        reason: FinishReason,
    },
}

/// State reachable from the backend's completion callback.
struct Shared {
    slot: SlotId,
    state: SessionState,
    active: Mutex<Option<(u64, PlaybackHandle)>>,
    events: broadcast::Sender<SessionEvent>,
}

impl Shared {
    fn active(&self) -> MutexGuard<'_, Option<(u64, PlaybackHandle)>> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// End `generation` if it is still the active playback.
    fn finish(&self, generation: u64, reason: FinishReason) -> bool {
        if !self.state.finish(generation) {
            tracing::debug!(slot = %self.slot, generation, "Stale playback completion ignored");
            return false;
        }
        self.clear_active(generation);
        self.emit_finished(generation, reason);
        true
    }

    fn clear_active(&self, generation: u64) -> Option<PlaybackHandle> {
        let mut active = self.active();
        match active.take() {
            Some((gen_id, handle)) if gen_id == generation => Some(handle),
            other => {
                *active = other;
                None
            }
        }
    }

    fn emit_finished(&self, generation: u64, reason: FinishReason) {
        tracing::info!(slot = %self.slot, generation, ?reason, "Narration playback finished");
        // No subscribers is fine.
        let _ = self.events.send(SessionEvent::Finished {
            slot: self.slot,
            generation,
            reason,
        });
    }
}

/// Claim on an idle slot, held while the audio is being produced.
///
/// Dropping it without calling [`PlaybackSession::start_reserved`] returns
/// the slot to Idle.
#[must_use = "dropping a reservation releases the slot"]
pub struct Reservation {
    shared: Arc<Shared>,
    generation: u64,
}

impl Reservation {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        // No-op once consumed or cancelled: the phase is no longer
        // Reserved under this generation.
        if self.shared.state.release(self.generation) {
            tracing::debug!(
                slot = %self.shared.slot,
                generation = self.generation,
                "Slot reservation released"
            );
        }
    }
}

impl std::fmt::Debug for Reservation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reservation")
            .field("slot", &self.shared.slot)
            .field("generation", &self.generation)
            .finish()
    }
}

/// At-most-one playback for a single slot.
pub struct PlaybackSession {
    shared: Arc<Shared>,
    output: Arc<dyn AudioOutput>,
}

impl PlaybackSession {
    /// Create a session with its own event channel.
    pub fn new(slot: SlotId, output: Arc<dyn AudioOutput>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self::with_events(slot, output, events)
    }

    /// Create a session that publishes on an existing channel.
    ///
    /// Sessions sharing a channel share nothing else.
    pub fn with_events(
        slot: SlotId,
        output: Arc<dyn AudioOutput>,
        events: broadcast::Sender<SessionEvent>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                slot,
                state: SessionState::new(),
                active: Mutex::new(None),
                events,
            }),
            output,
        }
    }

    pub fn slot(&self) -> SlotId {
        self.shared.slot
    }

    pub fn state(&self) -> PlaybackState {
        self.shared.state.current()
    }

    pub fn is_playing(&self) -> bool {
        self.state() == PlaybackState::Playing
    }

    /// Reserved or playing.
    pub fn is_busy(&self) -> bool {
        self.state() != PlaybackState::Idle
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    /// Start playing `buffer`. Returns the playback's generation.
    ///
    /// Returns [`PlaybackError::Busy`] without touching the running playback
    /// if the slot is reserved or playing.
    pub fn start(&self, buffer: AudioBuffer) -> Result<u64, PlaybackError> {
        let Some(generation) = self.shared.state.try_begin() else {
            tracing::debug!(slot = %self.shared.slot, "Slot busy, ignoring playback request");
            return Err(PlaybackError::Busy);
        };
        self.play(generation, buffer)
    }

    /// Claim the slot before the audio exists. `None` if it is busy.
    pub fn reserve(&self) -> Option<Reservation> {
        let generation = self.shared.state.try_reserve()?;
        tracing::debug!(slot = %self.shared.slot, generation, "Slot reserved");
        Some(Reservation {
            shared: Arc::clone(&self.shared),
            generation,
        })
    }

    /// Play `buffer` under a reservation taken from this session.
    ///
    /// Returns [`PlaybackError::Cancelled`] if the reservation was cancelled
    /// while the audio was being produced.
    pub fn start_reserved(
        &self,
        reservation: Reservation,
        buffer: AudioBuffer,
    ) -> Result<u64, PlaybackError> {
        if !Arc::ptr_eq(&reservation.shared, &self.shared) {
            return Err(PlaybackError::Busy);
        }
        let generation = reservation.generation;
        if !self.shared.state.begin_reserved(generation) {
            tracing::debug!(slot = %self.shared.slot, generation, "Reservation no longer held");
            return Err(PlaybackError::Cancelled);
        }
        self.play(generation, buffer)
    }

    /// Hand `buffer` to the output. The state is already `Playing` under
    /// `generation`.
    fn play(&self, generation: u64, buffer: AudioBuffer) -> Result<u64, PlaybackError> {
        tracing::info!(
            slot = %self.shared.slot,
            generation,
            samples = buffer.samples().len(),
            duration_secs = format!("{:.2}", buffer.duration_secs()),
            "Starting narration playback"
        );
        let _ = self.shared.events.send(SessionEvent::Started {
            slot: self.shared.slot,
            generation,
        });

        let shared = Arc::clone(&self.shared);
        let on_complete: CompletionCallback = Box::new(move || {
            shared.finish(generation, FinishReason::Completed);
        });

        match self.output.play(buffer, on_complete) {
            Ok(handle) => {
                // The playback may already have completed or been cancelled
                // from another thread; only keep the handle while this
                // generation is still playing.
                let mut active = self.shared.active();
                if self.shared.state.current() == PlaybackState::Playing
                    && self.shared.state.generation() == generation
                {
                    *active = Some((generation, handle));
                } else {
                    drop(active);
                    self.output.cancel(&handle);
                }
                Ok(generation)
            }
            Err(e) => {
                tracing::warn!(slot = %self.shared.slot, error = %e, "Audio output refused buffer");
                self.shared.finish(generation, FinishReason::Failed);
                Err(e)
            }
        }
    }

    /// Halt the current playback, or drop a pending reservation. Idempotent.
    ///
    /// Returns `true` if there was something to cancel. A reservation never
    /// published `Started`, so cancelling one emits no event.
    pub fn cancel(&self) -> bool {
        match self.shared.state.stop() {
            None => false,
            Some((generation, PlaybackState::Reserved)) => {
                tracing::info!(slot = %self.shared.slot, generation, "Pending narration cancelled");
                true
            }
            Some((generation, _)) => {
                if let Some(handle) = self.shared.clear_active(generation) {
                    self.output.cancel(&handle);
                }
                self.shared.emit_finished(generation, FinishReason::Cancelled);
                true
            }
        }
    }
}

impl std::fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackSession")
            .field("slot", &self.shared.slot)
            .field("state", &self.state())
            .finish()
    }
}
