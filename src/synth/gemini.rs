//! Gemini TTS over the Generative Language REST API.
//!
//! POST `https://generativelanguage.googleapis.com/v1beta/models/{model}:generateContent`
//! with `responseModalities: ["AUDIO"]` and a prebuilt voice. The audio comes
//! back base64-encoded in `candidates[0].content.parts[0].inlineData.data`.

use std::future::Future;
use std::pin::Pin;

use serde::Deserialize;

use super::{SpeechSynthesizer, SynthesisError};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub struct GeminiTts {
    api_key: String,
    model: String,
    voice: String,
    prompt_prefix: String,
    client: reqwest::Client,
}

impl GeminiTts {
    pub fn new(api_key: &str, model: &str, voice: &str, prompt_prefix: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            voice: voice.to_string(),
            prompt_prefix: prompt_prefix.to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn request_body(&self, text: &str) -> serde_json::Value {
        serde_json::json!({
            "contents": [{
                "parts": [{ "text": format!("{}{}", self.prompt_prefix, text) }]
            }],
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "speechConfig": {
                    "voiceConfig": {
                        "prebuiltVoiceConfig": { "voiceName": self.voice }
                    }
                }
            }
        })
    }
}

impl SpeechSynthesizer for GeminiTts {
    fn synthesize(
        &self,
        text: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>, SynthesisError>> + Send + '_>> {
        let text = text.to_string();
        Box::pin(async move {
            if text.trim().is_empty() {
                return Ok(None);
            }

            tracing::info!(voice = %self.voice, text_len = text.len(), "Gemini TTS request");

            let url = format!("{}/{}:generateContent", API_BASE, self.model);
            let resp = self
                .client
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .json(&self.request_body(&text))
                .send()
                .await
                .map_err(|e| SynthesisError::Request(e.to_string()))?;

            if !resp.status().is_success() {
                let status = resp.status().as_u16();
                let body = resp.text().await.unwrap_or_default();
                return Err(SynthesisError::Api { status, body });
            }

            let parsed: GenerateContentResponse = resp
                .json()
                .await
                .map_err(|e| SynthesisError::Service(format!("Malformed TTS response: {}", e)))?;

            let payload = extract_audio(parsed);
            match &payload {
                Some(data) => tracing::info!(payload_len = data.len(), "Gemini TTS synthesis complete"),
                None => tracing::warn!("Gemini TTS response carried no audio"),
            }
            Ok(payload)
        })
    }

    fn name(&self) -> String {
        format!("Gemini TTS ({})", self.voice)
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default)]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    data: String,
    #[serde(default)]
    mime_type: Option<String>,
}

/// Pull the first part's inline audio out of a response.
fn extract_audio(resp: GenerateContentResponse) -> Option<String> {
    let inline = resp
        .candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .next()?
        .inline_data?;
    if let Some(mime) = &inline.mime_type {
        tracing::debug!(mime = %mime, "TTS payload format");
    }
    Some(inline.data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Option<String> {
        extract_audio(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn test_extract_audio() {
        let json = r#"{
            "candidates": [{
                "content": {
                    "parts": [{
                        "inlineData": { "mimeType": "audio/L16;codec=pcm;rate=24000", "data": "AEA=" }
                    }],
                    "role": "model"
                },
                "finishReason": "STOP"
            }]
        }"#;
        assert_eq!(parse(json), Some("AEA=".to_string()));
    }

    #[test]
    fn test_extract_audio_missing() {
        assert_eq!(parse("{}"), None);
        assert_eq!(parse(r#"{"candidates": []}"#), None);
        assert_eq!(parse(r#"{"candidates": [{}]}"#), None);
        assert_eq!(parse(r#"{"candidates": [{"content": {"parts": [{"text": "hi"}]}}]}"#), None);
    }

    #[test]
    fn test_request_body() {
        let tts = GeminiTts::new("key", "gemini-2.5-flash-preview-tts", "Kore", "Say warmly: ");
        let body = tts.request_body("Great job");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Say warmly: Great job");
        assert_eq!(body["generationConfig"]["responseModalities"][0], "AUDIO");
        assert_eq!(
            body["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]["voiceName"],
            "Kore"
        );
    }

    #[tokio::test]
    async fn test_blank_text_skips_request() {
        let tts = GeminiTts::new("key", "model", "Kore", "");
        assert_eq!(tts.synthesize("   ").await.unwrap(), None);
    }
}
