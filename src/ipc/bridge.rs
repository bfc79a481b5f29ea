//! IPC bridge: stdin reader and stdout event emitter.
//!
//! A blocking stdin reader thread sends deserialized commands through an
//! mpsc channel, plus a helper to emit JSON-line events to stdout.

use std::io::{self, BufRead, Write};

use tokio::sync::mpsc;
use tracing::{debug, error};

use super::{NarrationCommand, NarrationEvent};

/// Emit a `NarrationEvent` as a JSON line on stdout and flush.
pub fn emit_event(event: &NarrationEvent) {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    // Ignore write/flush errors, the pipe may be closed.
    let _ = write_event(&mut handle, event);
}

/// Serialize `event` as one JSON line into `out`.
pub fn write_event<W: Write>(out: &mut W, event: &NarrationEvent) -> io::Result<()> {
    let json = serde_json::to_string(event).map_err(io::Error::other)?;
    writeln!(out, "{}", json)?;
    out.flush()
}

/// Convenience helper for emitting error events.
pub fn emit_error(message: &str) {
    emit_event(&NarrationEvent::Error {
        message: message.to_string(),
    });
}

/// Normalize incoming JSON: if it has a `"type"` field but no `"command"`
/// field, rename `"type"` to `"command"` so serde can deserialize it.
fn normalize_command_json(input: &str) -> String {
    if let Ok(mut obj) = serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(input)
    {
        if !obj.contains_key("command") {
            if let Some(type_val) = obj.remove("type") {
                obj.insert("command".to_string(), type_val);
                if let Ok(json) = serde_json::to_string(&obj) {
                    return json;
                }
            }
        }
    }
    input.to_string()
}

/// Parse one stdin line. Blank lines yield `None`.
pub fn parse_command_line(line: &str) -> Option<Result<NarrationCommand, serde_json::Error>> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(serde_json::from_str(&normalize_command_json(trimmed)))
}

/// Spawn a blocking thread that reads JSON lines from stdin, deserializes
/// them into `NarrationCommand`, and forwards them through the returned
/// channel.
///
/// The thread exits when stdin is closed (parent process gone) or on
/// unrecoverable read error.
pub fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<NarrationCommand> {
    let (tx, rx) = mpsc::unbounded_channel();

    std::thread::spawn(move || {
        let stdin = io::stdin();
        let reader = stdin.lock();
        for line in reader.lines() {
            let text = match line {
                Ok(text) => text,
                Err(e) => {
                    error!("stdin read error: {}", e);
                    break;
                }
            };
            match parse_command_line(&text) {
                None => continue,
                Some(Ok(cmd)) => {
                    debug!(?cmd, "Received command from shell");
                    if tx.send(cmd).is_err() {
                        break; // Receiver dropped, main task is gone.
                    }
                }
                Some(Err(e)) => {
                    error!("Invalid JSON command: {} (input: {})", e, text.trim());
                    emit_error(&format!("Invalid JSON command: {}", e));
                }
            }
        }
        debug!("stdin reader thread exiting");
    });

    rx
}
