//! Command implementations
//!
//! Each command returns the payload that goes into the `result` field of the
//! output envelope.

pub mod drive;
pub mod server;
pub mod subscribed;

use crate::error::envelope_message;
use crate::resource::record::Record;
use crate::resource::ResourceType;
use anyhow::{Context, Result};
use rand::distributions::{Distribution, Uniform};
use serde_json::{json, Value};
use std::io::{BufRead, Write};

/// Characters used for generated VNC passwords
const PASSWORD_CODEX: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!#%()*+,-./:;<=>@^_";

pub const PASSWORD_LEN: usize = 24;

/// Serialization of the output envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

/// `{"status": bool, "result": payload}`
pub fn envelope(status: bool, result: Value) -> Value {
    json!({ "status": status, "result": result })
}

/// Envelope reporting a failed command
pub fn error_envelope(error: &anyhow::Error) -> Value {
    envelope(false, Value::String(envelope_message(error)))
}

/// Serialize an envelope in the requested format
pub fn render(envelope: &Value, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(envelope).context("Failed to serialize output")
        }
        OutputFormat::Yaml => serde_yaml::to_string(envelope).context("Failed to serialize output"),
    }
}

/// Generate a random password of `length` characters
pub fn mkpasswd(length: usize) -> String {
    let mut rng = rand::thread_rng();
    let alphabet = Uniform::from(0..PASSWORD_CODEX.len());
    (0..length)
        .map(|_| PASSWORD_CODEX[alphabet.sample(&mut rng)] as char)
        .collect()
}

/// Ask before a destructive action; `force` skips the prompt
pub fn confirm(record: &Value, kind: ResourceType, action: &str, label: &str, force: bool) -> Result<bool> {
    if force {
        return Ok(true);
    }
    let stdin = std::io::stdin();
    confirm_with(&mut stdin.lock(), &mut std::io::stderr(), record, kind, action, label)
}

fn confirm_with<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    record: &Value,
    kind: ResourceType,
    action: &str,
    label: &str,
) -> Result<bool> {
    let record = Record::new(kind, record);
    write!(
        output,
        "Confirm {} of {} {} {} [y/N]: ",
        action,
        label,
        record.name().unwrap_or(""),
        record.opt_str("uuid").unwrap_or("")
    )?;
    output.flush()?;

    let mut answer = String::new();
    input
        .read_line(&mut answer)
        .context("Failed to read confirmation")?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

/// Payload returned when the user declines a confirmation
pub fn averted(action: &str) -> Value {
    json!(format!("{} averted", action))
}
