//! Narration slots: UI surfaces that can each play one narration at a time.

use serde::{Deserialize, Serialize};

/// A surface that owns an independent playback session.
///
/// Serialized as `"daily_insight"` or `{"chat_message": 3}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotId {
    /// The daily-insight card on the dashboard.
    DailyInsight,
    /// A chat bubble, by message index.
    ChatMessage(usize),
}

impl std::fmt::Display for SlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DailyInsight => write!(f, "daily_insight"),
            Self::ChatMessage(index) => write!(f, "chat_message:{}", index),
        }
    }
}
