//! Backend response envelopes.
//!
//! The backend wraps successful payloads in a `data` key, and single
//! proposals one level deeper (`data.proposal`, `data.proposals` for
//! lists).  These helpers peel the wrappers off while tolerating
//! responses that arrive unwrapped.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::SubmissionError;

/// Unwrap `{"data": ...}` if present, otherwise return the value as-is.
fn unwrap_data(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Unwrap an optional inner key (e.g. `proposal`) after the `data` layer.
fn unwrap_inner(value: Value, key: &str) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key(key) => {
            map.remove(key).unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Decode a payload wrapped as `data` (or bare).
pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T, SubmissionError> {
    let payload = unwrap_data(value);
    serde_json::from_value(payload).map_err(|e| SubmissionError::Decode(e.to_string()))
}

/// Decode a payload wrapped as `data.<key>` (or `data`, or bare).
pub fn decode_keyed<T: DeserializeOwned>(value: Value, key: &str) -> Result<T, SubmissionError> {
    let payload = unwrap_inner(unwrap_data(value), key);
    serde_json::from_value(payload).map_err(|e| SubmissionError::Decode(e.to_string()))
}
