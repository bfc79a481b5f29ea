//! Remote speech synthesis.
//!
//! The synthesis service is a black box that turns text into a base64
//! payload of raw 24kHz mono PCM. [`SpeechSynthesizer`] is the seam the
//! narrator calls through; [`GeminiTts`] is the production adapter.

mod gemini;

use std::future::Future;
use std::pin::Pin;

pub use gemini::GeminiTts;

use crate::config::NarrationConfig;

/// Errors from a synthesis request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SynthesisError {
    /// The synthesizer cannot be built from the current configuration.
    #[error("synthesis not configured: {0}")]
    NotConfigured(String),
    /// Transport failure talking to the service.
    #[error("synthesis request failed: {0}")]
    Request(String),
    /// The service answered with an error status.
    #[error("synthesis API error {status}: {body}")]
    Api { status: u16, body: String },
    /// The service answered but the response was unusable.
    #[error("synthesis service error: {0}")]
    Service(String),
}

/// Common trait for synthesis backends (dyn-compatible).
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text`. `Ok(None)` means the service returned no audio.
    fn synthesize(
        &self,
        text: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>, SynthesisError>> + Send + '_>>;

    /// Display name (e.g. "Gemini TTS (Kore)").
    fn name(&self) -> String;
}

/// Build the synthesizer described by `config`.
pub fn create_synthesizer(
    config: &NarrationConfig,
) -> Result<Box<dyn SpeechSynthesizer>, SynthesisError> {
    let api_key = config
        .api_key
        .as_deref()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| SynthesisError::NotConfigured("Gemini TTS requires an API key".into()))?;

    let engine = GeminiTts::new(api_key, &config.model, &config.voice, &config.prompt_prefix);
    tracing::info!(synthesizer = %engine.name(), "Created speech synthesizer");
    Ok(Box::new(engine))
}
