//! Request Sanitization
//!
//! Requests reach the model as a reduced JSON payload. Free text is stripped
//! of HTML-like tags and length-capped; numbers, booleans and the fields the
//! caller expects echoed back are forwarded untouched.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::constants::sanitize::{
    MAX_LIST_ITEM_CHARS, MAX_STRING_CHARS, PAYLOAD_FIELDS, VERBATIM_FIELDS,
};
use crate::types::{GenerationRequest, Result};

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("Invalid tag regex"));

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Remove tags, then cap at `max` characters
pub fn clean_text(s: &str, max: usize) -> String {
    truncate_chars(&TAG_RE.replace_all(s, ""), max)
}

fn sanitize_value(field: &str, value: Value) -> Value {
    if VERBATIM_FIELDS.contains(&field) {
        return value;
    }
    match value {
        Value::String(s) => Value::String(clean_text(&s, MAX_STRING_CHARS)),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => Value::String(clean_text(&s, MAX_LIST_ITEM_CHARS)),
                    other => other,
                })
                .collect(),
        ),
        other => other,
    }
}

/// Sanitize every top-level field of a serialized request
pub fn sanitize_map(fields: Map<String, Value>) -> Map<String, Value> {
    fields
        .into_iter()
        .map(|(key, value)| {
            let cleaned = sanitize_value(&key, value);
            (key, cleaned)
        })
        .collect()
}

/// Sanitized payload restricted to the allow-listed fields, in a stable
/// key order
pub fn reduced_payload(request: &GenerationRequest) -> Result<Map<String, Value>> {
    let fields = match serde_json::to_value(request)? {
        Value::Object(fields) => fields,
        _ => Map::new(),
    };

    let mut payload = Map::new();
    for (key, value) in sanitize_map(fields) {
        if PAYLOAD_FIELDS.contains(&key.as_str()) {
            payload.insert(key, value);
        }
    }
    Ok(payload)
}
