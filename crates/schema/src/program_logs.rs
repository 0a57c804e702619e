//! Extraction of Anchor events from transaction log messages.
//!
//! Anchor programs emit events as `Program data: <base64>` log lines. A
//! transaction fetched with `getTransaction` carries them under
//! `meta.logMessages`.

use crate::swap_event::{DecodeError, SwapEvent};
use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use log::debug;
use serde_json::Value;

/// Raydium concentrated liquidity program ID (mainnet)
pub const RAYDIUM_CLMM_PROGRAM_ID: &str = "CAMMCzo5YL8w4VFF8KVHrK22GGUsp5VTaW7grrKgrWqK";

pub const PROGRAM_DATA_PREFIX: &str = "Program data: ";

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("log line {line}: invalid base64: {source}")]
    Base64 {
        line: usize,
        #[source]
        source: base64::DecodeError,
    },

    #[error("log line {line}: {source}")]
    Decode {
        line: usize,
        #[source]
        source: DecodeError,
    },
}

/// Returns `None` when the line is not a `Program data:` line.
pub fn program_data(line: &str) -> Option<Result<Vec<u8>, base64::DecodeError>> {
    line.strip_prefix(PROGRAM_DATA_PREFIX)
        .map(|data| BASE64_STANDARD.decode(data.trim()))
}

/// Decode every swap event found in `logs`, in log order.
///
/// `Program data:` payloads carrying another event's discriminator are
/// skipped. Undecodable base64, or a swap payload that fails to decode,
/// fails the whole call.
pub fn swap_events_from_logs<S: AsRef<str>>(logs: &[S]) -> Result<Vec<SwapEvent>, LogError> {
    let mut events = Vec::new();

    for (line, entry) in logs.iter().enumerate() {
        let bytes = match program_data(entry.as_ref()) {
            None => continue,
            Some(decoded) => decoded.map_err(|source| LogError::Base64 { line, source })?,
        };

        if !bytes.starts_with(&SwapEvent::DISCRIMINATOR) {
            debug!(
                "skipping program data at line {} ({} bytes, not a swap event)",
                line,
                bytes.len()
            );
            continue;
        }

        let event =
            SwapEvent::decode_checked(&bytes).map_err(|source| LogError::Decode { line, source })?;
        events.push(event);
    }

    Ok(events)
}

/// `meta.logMessages` from a `getTransaction` result; empty when absent.
pub fn log_messages(tx: &Value) -> Vec<String> {
    tx.pointer("/meta/logMessages")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|x| x.as_str().map(|s| s.to_string()))
                .collect()
        })
        .unwrap_or_default()
}

/// Whether the transaction invoked the Raydium CLMM program at any depth.
pub fn invokes_raydium_clmm(logs: &[String]) -> bool {
    let invoke = format!("Program {} invoke", RAYDIUM_CLMM_PROGRAM_ID);
    logs.iter().any(|l| l.starts_with(&invoke))
}
