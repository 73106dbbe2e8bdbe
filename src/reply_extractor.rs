//! Best-effort extraction of the drawable JSON payload from an assistant
//! reply.
//!
//! Replies are expected to carry a JSON object but routinely arrive wrapped
//! in markdown code fences or with unquoted keys/values. The routine strips
//! a single fence pair, tries a strict parse, and only on failure applies a
//! bare-token quoting pass before parsing once more. One pass per call; no
//! retries, no streaming.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Prefix carried by the chat string when the reply never parses.
pub const INVALID_JSON_PREFIX: &str = "Invalid JSON string: ";

/// The drawable half of a parsed reply. Absent keys fall back to empty
/// arrays so downstream canvas code never sees a missing field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawPayload {
    pub keyinfo: Value,
    pub connections: Value,
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Failed to preprocess JSON: {source}")]
    Repair {
        #[source]
        source: serde_json::Error,
    },
}

lazy_static! {
    // Bare word in key position: directly after `{` or `,`, colon ahead.
    // A quoted key never matches because the quote sits between the
    // delimiter and the word.
    static ref BARE_KEY: Regex = Regex::new(r"([{,]\s*)(\w+)(\s*:)").unwrap();
    // Bare word in value position: after a colon, `,` or `}` ahead.
    static ref BARE_VALUE: Regex = Regex::new(r"(:\s*)(\w+)(\s*[,}])").unwrap();
}

/// Strip a single markdown fence pair and parse, repairing unquoted keys
/// and values only if the strict parse fails.
pub fn preprocess_json(raw: &str) -> Result<Value, ExtractError> {
    let mut text = raw.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        text = stripped.trim_start();
    }
    if let Some(stripped) = text.strip_suffix("```") {
        text = stripped.trim_end();
    }

    match serde_json::from_str(text) {
        Ok(value) => Ok(value),
        Err(_) => {
            let keyed = BARE_KEY.replace_all(text, "${1}\"${2}\"${3}");
            let repaired = BARE_VALUE.replace_all(&keyed, "${1}\"${2}\"${3}");
            serde_json::from_str(&repaired).map_err(|source| ExtractError::Repair { source })
        }
    }
}

/// Project a raw reply into the draw payload and the chat string.
///
/// On parse failure the payload is `None` and the chat string carries the
/// tagged error text; the caller still answers HTTP 200 with it.
pub fn split_reply(raw: &str) -> (Option<DrawPayload>, String) {
    match preprocess_json(raw) {
        Ok(parsed) => {
            let draw = DrawPayload {
                keyinfo: parsed
                    .get("keyinfo")
                    .cloned()
                    .unwrap_or_else(|| Value::Array(Vec::new())),
                connections: parsed
                    .get("connections")
                    .cloned()
                    .unwrap_or_else(|| Value::Array(Vec::new())),
            };
            let chat = match parsed.get("message") {
                None => String::new(),
                Some(Value::String(text)) => text.clone(),
                Some(other) => other.to_string(),
            };
            (Some(draw), chat)
        }
        Err(err) => (None, format!("{INVALID_JSON_PREFIX}{err}")),
    }
}
