//! Loose readers for JSON produced by the remote agent.
//!
//! The agent is asked for a schema but is not held to it: numbers arrive as
//! strings, lists arrive as single strings, and keys move between nesting
//! levels. These helpers accept the common variations and ignore the rest.

use serde_json::Value;

/// A number, or a string holding one (a trailing `%` is ignored).
pub(crate) fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse().ok(),
        _ => None,
    }
}

/// A non-empty string; numbers and booleans are rendered.
pub(crate) fn text(value: Option<&Value>) -> Option<String> {
    let s = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

/// A list of strings.
///
/// Accepts an array of strings, of objects carrying a `path`, `name` or
/// `description`, or a single string.
pub(crate) fn text_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::Object(map) => ["path", "name", "file", "description"]
                    .iter()
                    .find_map(|key| text(map.get(*key))),
                other => text(Some(other)),
            })
            .collect(),
        Some(other) => text(Some(other)).into_iter().collect(),
        None => Vec::new(),
    }
}

/// Looks `key` up in each of `sections` (nested objects), then at the top level.
pub(crate) fn find<'a>(value: &'a Value, sections: &[&str], key: &str) -> Option<&'a Value> {
    sections
        .iter()
        .filter_map(|section| value.get(*section))
        .find_map(|section| section.get(key))
        .or_else(|| value.get(key))
        .filter(|v| !v.is_null())
}
