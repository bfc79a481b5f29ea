//! Configuration reading and data directory paths.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::audio::{buffer::max_samples_for, DEFAULT_MAX_BUFFER_SECONDS, SAMPLE_RATE};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-tts";
pub const DEFAULT_VOICE: &str = "Kore";
pub const DEFAULT_PROMPT_PREFIX: &str = "Say in a warm, encouraging voice: ";

const APP_DIR: &str = "fitflow-narration";

/// Environment variables checked for the API key, in order.
const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// narration_config.json shape. Every field is optional on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NarrationConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub voice: String,
    pub prompt_prefix: String,
    /// Output device name; `None` uses the system default.
    pub output_device: Option<String>,
    pub volume: f32,
    pub max_buffer_seconds: u32,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            voice: DEFAULT_VOICE.to_string(),
            prompt_prefix: DEFAULT_PROMPT_PREFIX.to_string(),
            output_device: None,
            volume: 1.0,
            max_buffer_seconds: DEFAULT_MAX_BUFFER_SECONDS,
        }
    }
}

impl NarrationConfig {
    /// Largest buffer the narrator will build, in samples.
    pub fn max_buffer_samples(&self) -> usize {
        max_samples_for(self.max_buffer_seconds, SAMPLE_RATE)
    }

    /// Take the API key from the environment when one is set.
    pub fn apply_env(&mut self) {
        self.apply_api_key(API_KEY_VARS.iter().find_map(|var| std::env::var(var).ok()));
    }

    fn apply_api_key(&mut self, key: Option<String>) {
        if let Some(key) = key.filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }
    }
}

// The API key must never reach the logs.
impl std::fmt::Display for NarrationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "model={} voice={} device={} volume={} max_buffer_seconds={} api_key={}",
            self.model,
            self.voice,
            self.output_device.as_deref().unwrap_or("default"),
            self.volume,
            self.max_buffer_seconds,
            if self.api_key.is_some() { "set" } else { "unset" },
        )
    }
}

/// Read narration_config.json from the data directory, then apply
/// environment overrides.
pub fn read_narration_config() -> NarrationConfig {
    let mut config = read_config_from(&get_config_path());
    config.apply_env();
    config
}

/// Read a config file, falling back to defaults when missing or invalid.
pub fn read_config_from(path: &Path) -> NarrationConfig {
    read_json_file(path).unwrap_or_default()
}

/// `<platform config dir>/fitflow-narration/data`.
pub fn get_data_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("data")
}

/// Path to narration_config.json.
pub fn get_config_path() -> PathBuf {
    get_data_dir().join("narration_config.json")
}

/// Generic helper: read a JSON file and deserialize it.
fn read_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Option<T> {
    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(val) => Some(val),
            Err(e) => {
                warn!("Failed to parse {}: {}", path.display(), e);
                None
            }
        },
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to read {}: {}", path.display(), e);
            }
            None
        }
    }
}
