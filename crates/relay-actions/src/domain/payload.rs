//! Helpers for reading request payloads.
//!
//! Request fields with a default fall back to it when the field is absent,
//! `null`, `false`, `0` or an empty string.

use serde_json::Value;

/// Is `value` a usable, non-empty value?
#[must_use]
pub fn is_set(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// `value` if it is set, otherwise `default`.
#[must_use]
pub fn or_default(value: Option<Value>, default: Value) -> Value {
    value.filter(is_set).unwrap_or(default)
}

/// `value` if it is a non-empty string, otherwise `default`.
#[must_use]
pub fn str_or(value: Option<String>, default: &str) -> String {
    value
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}
