//! Coercion helpers over opaque node outputs.
//!
//! Outputs are plain JSON shaped per node type: `{"text":…,"output":…}`
//! from text nodes, `{"output":url}` from uploads and media transforms,
//! `{"output":text}` from LLM calls. Downstream nodes read whichever field
//! their input expects, falling back across the known shapes so that any
//! producer can feed any consumer of the same media type.

use serde_json::Value;

/// Extract the textual payload of an upstream output
pub fn text_of(value: &Value) -> Option<String> {
    value
        .get("text")
        .and_then(Value::as_str)
        .or_else(|| value.get("output").and_then(Value::as_str))
        .or_else(|| value.as_str())
        .map(str::to_string)
}

/// Extract a single media URL from an upstream output
pub fn url_of(value: &Value) -> Option<String> {
    value
        .get("output")
        .and_then(Value::as_str)
        .or_else(|| value.as_str())
        .map(str::to_string)
}

/// Extract zero or more image URLs from an upstream output.
///
/// Accepts the property names different producers use, a raw string, or an
/// array of strings.
pub fn urls_of(value: &Value) -> Vec<String> {
    let candidate = value
        .get("outputUrl")
        .or_else(|| value.get("output"))
        .or_else(|| value.get("image_url"))
        .unwrap_or(value);

    match candidate {
        Value::String(url) => vec![url.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Unwrap the scalar an output sink should display, preferring the known
/// payload fields over the raw object
pub fn unwrap_scalar(value: &Value) -> Value {
    for key in ["output", "outputUrl", "image_url", "text"] {
        if let Some(inner) = value.get(key) {
            if !inner.is_null() {
                return inner.clone();
            }
        }
    }
    value.clone()
}
