//! Narration host: JSON-line IPC on stdin/stdout.
//!
//! Initializes config, the synthesizer and the audio output, then runs the
//! command loop. Logs go to stderr; stdout carries only IPC events.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use narration_core::config::read_narration_config;
use narration_core::ipc::bridge::{emit_error, emit_event, spawn_stdin_reader};
use narration_core::ipc::{NarrationCommand, NarrationEvent};
use narration_core::playback::{list_output_devices, AudioOutput, RodioOutput};
use narration_core::synth::{create_synthesizer, SpeechSynthesizer};
use narration_core::{NarrationOutcome, Narrator, SlotId};

#[tokio::main]
async fn main() {
    // Initialize tracing (respects RUST_LOG env, defaults to info)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    emit_event(&NarrationEvent::Starting {});

    let config = read_narration_config();
    info!(%config, "Configuration loaded");

    let synthesizer: Option<Arc<dyn SpeechSynthesizer>> = match create_synthesizer(&config) {
        Ok(engine) => Some(Arc::from(engine)),
        Err(e) => {
            warn!(error = %e, "Narration will only play pre-synthesized audio");
            None
        }
    };
    let synthesizer_name = synthesizer.as_ref().map(|s| s.name());

    let output: Arc<dyn AudioOutput> =
        Arc::new(RodioOutput::new(config.output_device.clone(), config.volume));
    let narrator = Arc::new(Narrator::new(
        synthesizer,
        output,
        config.max_buffer_samples(),
    ));

    spawn_event_forwarder(&narrator);
    let mut cmd_rx = spawn_stdin_reader();

    emit_event(&NarrationEvent::Ready {
        synthesizer: synthesizer_name,
    });
    info!("Narration core ready");

    // Main loop: process commands from the shell
    loop {
        match cmd_rx.recv().await {
            Some(command) => {
                if !handle_command(&narrator, command) {
                    break; // Stop command received
                }
            }
            None => {
                // stdin closed, parent process gone
                info!("stdin closed, shutting down");
                break;
            }
        }
    }

    info!("Narration core shutting down");
}

/// Relay session lifecycle events to the shell as speaking indicators.
fn spawn_event_forwarder(narrator: &Arc<Narrator>) {
    let mut events = narrator.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => emit_event(&NarrationEvent::from(event)),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Session event forwarder lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}

/// Handle a single command from the shell.
/// Returns `false` if the main loop should exit.
fn handle_command(narrator: &Arc<Narrator>, cmd: NarrationCommand) -> bool {
    match cmd {
        NarrationCommand::Ping {} => {
            emit_event(&NarrationEvent::Pong {});
        }

        NarrationCommand::Stop {} => {
            emit_event(&NarrationEvent::Stopping {});
            return false;
        }

        NarrationCommand::Narrate { slot, text } => {
            info!(slot = %slot, text_len = text.len(), "Narration requested");
            let narrator = Arc::clone(narrator);
            tokio::spawn(async move {
                let outcome = narrator.narrate(slot, &text).await;
                report_outcome(slot, outcome);
            });
        }

        NarrationCommand::PlayAudio { slot, audio } => {
            info!(slot = %slot, payload_len = audio.len(), "Playback requested");
            let narrator = Arc::clone(narrator);
            // Opening the output device blocks briefly.
            tokio::task::spawn_blocking(move || {
                let outcome = narrator.play_payload(slot, &audio);
                report_outcome(slot, outcome);
            });
        }

        NarrationCommand::Cancel { slot } => {
            if !narrator.cancel(slot) {
                info!(slot = %slot, "Cancel requested but slot is idle");
            }
        }

        NarrationCommand::Status { slot } => {
            emit_event(&NarrationEvent::SlotStatus {
                slot,
                playing: narrator.is_playing(slot),
                busy: narrator.is_busy(slot),
            });
        }

        NarrationCommand::ReleaseSlot { slot } => {
            if narrator.remove_slot(slot) {
                info!(slot = %slot, "Slot released");
            }
        }

        NarrationCommand::ListOutputDevices {} => match list_output_devices() {
            Ok(devices) => emit_event(&NarrationEvent::OutputDevices { devices }),
            Err(e) => emit_error(&e.to_string()),
        },
    }

    true
}

/// Speaking start/end come from session events, and a cancelled
/// reservation never started speaking. Only report the rest.
fn report_outcome(slot: SlotId, outcome: NarrationOutcome) {
    match outcome {
        NarrationOutcome::Started { .. } | NarrationOutcome::Cancelled => {}
        NarrationOutcome::Busy => emit_event(&NarrationEvent::Busy { slot }),
        NarrationOutcome::NoAudio => emit_event(&NarrationEvent::NarrationFailed {
            slot,
            message: "No audio returned".into(),
        }),
        NarrationOutcome::Failed(e) => emit_event(&NarrationEvent::NarrationFailed {
            slot,
            message: e.to_string(),
        }),
    }
}
