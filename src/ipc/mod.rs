//! IPC protocol types for communication with the app shell.
//!
//! Events use `{"event": "<name>", "data": {...}}` format (Rust -> shell).
//! Commands use `{"command": "<name>", ...}` format (shell -> Rust).

pub mod bridge;

use serde::{Deserialize, Serialize};

use crate::playback::{FinishReason, SessionEvent};
use crate::slot::SlotId;

// ---------------------------------------------------------------------------
// Events: Rust -> shell (stdout)
// ---------------------------------------------------------------------------

/// All events emitted to the shell via stdout as JSON lines.
///
/// Serialized as `{"event": "<variant>", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data")]
#[serde(rename_all = "snake_case")]
pub enum NarrationEvent {
    Starting {},
    Ready { synthesizer: Option<String> },
    Pong {},
    Stopping {},
    SpeakingStart { slot: SlotId },
    SpeakingEnd { slot: SlotId, cancelled: bool },
    Busy { slot: SlotId },
    NarrationFailed { slot: SlotId, message: String },
    /// `busy` also covers a narration still being synthesized.
    SlotStatus {
        slot: SlotId,
        playing: bool,
        busy: bool,
    },
    OutputDevices { devices: Vec<String> },
    Error { message: String },
}

impl From<SessionEvent> for NarrationEvent {
    fn from(event: SessionEvent) -> Self {
        match event {
            SessionEvent::Started { slot, .. } => Self::SpeakingStart { slot },
            SessionEvent::Finished { slot, reason, .. } => Self::SpeakingEnd {
                slot,
                cancelled: reason == FinishReason::Cancelled,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Commands: shell -> Rust (stdin)
// ---------------------------------------------------------------------------

/// All commands received from the shell via stdin as JSON lines.
///
/// Deserialized from `{"command": "<variant>", ...}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "command")]
#[serde(rename_all = "snake_case")]
pub enum NarrationCommand {
    /// Synthesize `text` and play it on `slot`.
    Narrate { slot: SlotId, text: String },
    /// Play a base64 PCM payload the shell already has.
    PlayAudio { slot: SlotId, audio: String },
    Cancel { slot: SlotId },
    Status { slot: SlotId },
    /// The slot's message is gone; cancel it and drop its session.
    ReleaseSlot { slot: SlotId },
    ListOutputDevices {},
    Ping {},
    Stop {},
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_narrate_command() {
        let cmd: NarrationCommand = serde_json::from_str(
            r#"{"command": "narrate", "slot": "daily_insight", "text": "Breathe."}"#,
        )
        .unwrap();
        assert_eq!(
            cmd,
            NarrationCommand::Narrate {
                slot: SlotId::DailyInsight,
                text: "Breathe.".into()
            }
        );
    }

    #[test]
    fn test_play_audio_command() {
        let cmd: NarrationCommand = serde_json::from_str(
            r#"{"command": "play_audio", "slot": {"chat_message": 5}, "audio": "AEA="}"#,
        )
        .unwrap();
        assert_eq!(
            cmd,
            NarrationCommand::PlayAudio {
                slot: SlotId::ChatMessage(5),
                audio: "AEA=".into()
            }
        );
    }

    #[test]
    fn test_unit_commands() {
        let cmd: NarrationCommand = serde_json::from_str(r#"{"command": "ping"}"#).unwrap();
        assert_eq!(cmd, NarrationCommand::Ping {});
        let cmd: NarrationCommand =
            serde_json::from_str(r#"{"command": "list_output_devices"}"#).unwrap();
        assert_eq!(cmd, NarrationCommand::ListOutputDevices {});
    }

    #[test]
    fn test_release_slot_command() {
        let cmd: NarrationCommand = serde_json::from_str(
            r#"{"command": "release_slot", "slot": {"chat_message": 7}}"#,
        )
        .unwrap();
        assert_eq!(
            cmd,
            NarrationCommand::ReleaseSlot {
                slot: SlotId::ChatMessage(7)
            }
        );
    }

    #[test]
    fn test_slot_status_shape() {
        let json = serde_json::to_string(&NarrationEvent::SlotStatus {
            slot: SlotId::DailyInsight,
            playing: false,
            busy: true,
        })
        .unwrap();
        assert_eq!(
            json,
            r#"{"event":"slot_status","data":{"slot":"daily_insight","playing":false,"busy":true}}"#
        );
    }

    #[test]
    fn test_unknown_command_rejected() {
        assert!(serde_json::from_str::<NarrationCommand>(r#"{"command": "dance"}"#).is_err());
    }

    #[test]
    fn test_event_shape() {
        let json = serde_json::to_string(&NarrationEvent::SpeakingEnd {
            slot: SlotId::ChatMessage(1),
            cancelled: true,
        })
        .unwrap();
        assert_eq!(
            json,
            r#"{"event":"speaking_end","data":{"slot":{"chat_message":1},"cancelled":true}}"#
        );

        let json = serde_json::to_string(&NarrationEvent::Pong {}).unwrap();
        assert_eq!(json, r#"{"event":"pong","data":{}}"#);
    }

    #[test]
    fn test_session_event_mapping() {
        let started = SessionEvent::Started {
            slot: SlotId::DailyInsight,
            generation: 3,
        };
        assert_eq!(
            NarrationEvent::from(started),
            NarrationEvent::SpeakingStart {
                slot: SlotId::DailyInsight
            }
        );

        let failed = SessionEvent::Finished {
            slot: SlotId::DailyInsight,
            generation: 3,
            reason: FinishReason::Failed,
        };
        assert_eq!(
            NarrationEvent::from(failed),
            NarrationEvent::SpeakingEnd {
                slot: SlotId::DailyInsight,
                cancelled: false
            }
        );
    }
}
