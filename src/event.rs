//! Helpers for reading fields out of audit events.
//!
//! Events are plain [`serde_json::Value`] objects addressed with JSON
//! pointers (`/a/b`). Every event carries `_id`, `timestamp` and `eventName`;
//! the remaining fields are defined by the topic schema.

use serde_json::Value;

/// Unique event identifier.
pub const ID: &str = "_id";
/// RFC 3339 time at which the event occurred.
pub const TIMESTAMP: &str = "timestamp";
/// Name of the audited action.
pub const EVENT_NAME: &str = "eventName";

/// Prefix `field` with `/` unless it already is a pointer.
pub fn normalise_pointer(field: &str) -> String {
    if field.starts_with('/') {
        field.to_owned()
    } else {
        format!("/{field}")
    }
}

/// Convert a JSON pointer into dot notation (`/a/b` becomes `a.b`).
pub fn pointer_to_dot_notation(pointer: &str) -> String {
    pointer
        .strip_prefix('/')
        .unwrap_or(pointer)
        .split('/')
        .map(|token| token.replace("~1", "/").replace("~0", "~"))
        .collect::<Vec<_>>()
        .join(".")
}

/// Render the value at `pointer` as a string.
///
/// Strings are returned verbatim, other scalars and containers as compact
/// JSON. Absent and `null` values yield `None`.
pub fn value_as_string(event: &Value, pointer: &str) -> Option<String> {
    match event.pointer(pointer)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Borrow the string at top-level `field`, if it is one.
pub fn top_level_str<'a>(event: &'a Value, field: &str) -> Option<&'a str> {
    event.get(field).and_then(Value::as_str)
}
