//! Narration trigger: synthesis -> decode -> buffer -> per-slot playback.
//!
//! The slot is reserved for the whole request. Every failure along the way
//! degrades to silence: the reservation is released, the cause is logged,
//! and the outcome is reported to the caller.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::broadcast;

use crate::audio::{
    decode_payload, strip_data_url, AllocationError, AudioBuffer, DecodeError, PayloadError,
};
use crate::playback::{AudioOutput, PlaybackError, PlaybackSession, SessionEvent};
use crate::slot::SlotId;
use crate::synth::{SpeechSynthesizer, SynthesisError};

const EVENT_CAPACITY: usize = 256;

/// Any failure between a narration request and audible output.
#[derive(Debug, thiserror::Error)]
pub enum NarrationError {
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Allocation(#[from] AllocationError),
    #[error(transparent)]
    Playback(#[from] PlaybackError),
}

impl From<PayloadError> for NarrationError {
    fn from(e: PayloadError) -> Self {
        match e {
            PayloadError::Decode(e) => Self::Decode(e),
            PayloadError::Allocation(e) => Self::Allocation(e),
        }
    }
}

/// What happened to a narration request.
#[derive(Debug)]
pub enum NarrationOutcome {
    /// Audio is playing on the slot.
    Started { generation: u64 },
    /// The slot was already synthesizing or playing; the request was dropped.
    Busy,
    /// The slot was cancelled while its audio was being synthesized.
    Cancelled,
    /// The synthesizer returned nothing (or none is configured).
    NoAudio,
    /// Something failed; nothing is playing.
    Failed(NarrationError),
}

impl NarrationOutcome {
    pub fn is_started(&self) -> bool {
        matches!(self, Self::Started { .. })
    }
}

/// Owns one [`PlaybackSession`] per slot, created on first use.
pub struct Narrator {
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    output: Arc<dyn AudioOutput>,
    max_buffer_samples: usize,
    sessions: Mutex<HashMap<SlotId, Arc<PlaybackSession>>>,
    events: broadcast::Sender<SessionEvent>,
}

impl Narrator {
    pub fn new(
        synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
        output: Arc<dyn AudioOutput>,
        max_buffer_samples: usize,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            synthesizer,
            output,
            max_buffer_samples,
            sessions: Mutex::new(HashMap::new()),
            events,
        }
    }

    /// Events from every slot's session.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<SlotId, Arc<PlaybackSession>>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn session(&self, slot: SlotId) -> Arc<PlaybackSession> {
        let mut sessions = self.sessions();
        let session = sessions.entry(slot).or_insert_with(|| {
            Arc::new(PlaybackSession::with_events(
                slot,
                Arc::clone(&self.output),
                self.events.clone(),
            ))
        });
        Arc::clone(session)
    }

    fn existing(&self, slot: SlotId) -> Option<Arc<PlaybackSession>> {
        self.sessions().get(&slot).cloned()
    }

    pub fn is_playing(&self, slot: SlotId) -> bool {
        self.existing(slot).map(|s| s.is_playing()).unwrap_or(false)
    }

    /// Synthesizing or playing.
    pub fn is_busy(&self, slot: SlotId) -> bool {
        self.existing(slot).map(|s| s.is_busy()).unwrap_or(false)
    }

    /// Halt narration on `slot`, including one still being synthesized.
    /// Returns `true` if there was something to halt.
    pub fn cancel(&self, slot: SlotId) -> bool {
        self.existing(slot).map(|s| s.cancel()).unwrap_or(false)
    }

    /// Forget `slot`'s session, cancelling whatever it was doing. Used when
    /// the shell discards the message a slot belonged to.
    ///
    /// Returns `true` if the slot had a session.
    pub fn remove_slot(&self, slot: SlotId) -> bool {
        let Some(session) = self.sessions().remove(&slot) else {
            return false;
        };
        session.cancel();
        tracing::debug!(slot = %slot, "Slot session removed");
        true
    }

    /// Number of slots with a live session.
    pub fn slot_count(&self) -> usize {
        self.sessions().len()
    }

    /// Synthesize `text` and play it on `slot`.
    ///
    /// The slot is reserved before the synthesizer is called, so a second
    /// request during synthesis is reported busy and never synthesized.
    pub async fn narrate(&self, slot: SlotId, text: &str) -> NarrationOutcome {
        let session = self.session(slot);
        let Some(reservation) = session.reserve() else {
            tracing::debug!(slot = %slot, "Narration already in progress, skipping synthesis");
            return NarrationOutcome::Busy;
        };

        let Some(synthesizer) = &self.synthesizer else {
            tracing::warn!(slot = %slot, "No speech synthesizer configured, skipping narration");
            return NarrationOutcome::NoAudio;
        };

        let payload = match synthesizer.synthesize(text).await {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                tracing::warn!(slot = %slot, "Synthesizer returned no audio");
                return NarrationOutcome::NoAudio;
            }
            Err(e) => {
                tracing::warn!(slot = %slot, error = %e, "Narration synthesis failed");
                return NarrationOutcome::Failed(e.into());
            }
        };

        // Opening the output device blocks until the stream is up.
        let max_samples = self.max_buffer_samples;
        let task = tokio::task::spawn_blocking(move || {
            match decode_for(slot, &payload, max_samples) {
                Ok(buffer) => start_outcome(slot, session.start_reserved(reservation, buffer)),
                Err(e) => NarrationOutcome::Failed(e),
            }
        });
        match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(slot = %slot, error = %e, "Narration playback task failed");
                NarrationOutcome::Failed(
                    PlaybackError::Device(format!("playback task failed: {}", e)).into(),
                )
            }
        }
    }

    /// Play an already-synthesized payload on `slot`. Blocks while the
    /// output device opens.
    pub fn play_payload(&self, slot: SlotId, payload: &str) -> NarrationOutcome {
        let session = self.session(slot);
        match decode_for(slot, payload, self.max_buffer_samples) {
            Ok(buffer) => start_outcome(slot, session.start(buffer)),
            Err(e) => NarrationOutcome::Failed(e),
        }
    }
}

fn decode_for(
    slot: SlotId,
    payload: &str,
    max_samples: usize,
) -> Result<AudioBuffer, NarrationError> {
    decode_payload(strip_data_url(payload), max_samples).map_err(|e| {
        tracing::warn!(slot = %slot, error = %e, "Narration payload rejected");
        e.into()
    })
}

fn start_outcome(slot: SlotId, started: Result<u64, PlaybackError>) -> NarrationOutcome {
    match started {
        Ok(generation) => NarrationOutcome::Started { generation },
        Err(PlaybackError::Busy) => NarrationOutcome::Busy,
        Err(PlaybackError::Cancelled) => NarrationOutcome::Cancelled,
        Err(e) => {
            tracing::warn!(slot = %slot, error = %e, "Narration playback failed");
            NarrationOutcome::Failed(e.into())
        }
    }
}
