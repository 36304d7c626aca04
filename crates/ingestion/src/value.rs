//! Helpers for reading loosely typed feed payloads.
//!
//! The feed mixes numbers and numeric strings for the same field and uses
//! empty strings for "no value", so every accessor is lenient about type and
//! strict about emptiness.

use contracts::SessionTime;
use serde_json::Value;

use crate::clock::parse_session_time;

/// Walk nested object keys.
pub fn get_path<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, key| current.get(*key))
}

/// Whether a value carries data: non-empty, non-zero, non-null, not `false`.
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Nested lookup that treats empty values as absent.
pub fn get_present<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    get_path(value, path).filter(|v| is_present(v))
}

pub fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn as_u32(value: &Value) -> Option<u32> {
    as_i64(value).and_then(|v| u32::try_from(v).ok())
}

pub fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Booleans as sent by the feed: `true`, `"true"`, `1` or `"1"`.
pub fn as_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim() {
            "true" | "True" | "1" => Some(true),
            "false" | "False" | "0" | "" => Some(false),
            _ => None,
        },
        Value::Number(_) => as_i64(value).map(|v| v != 0),
        _ => None,
    }
}

pub fn as_session_time(value: &Value) -> Option<SessionTime> {
    value.as_str().and_then(parse_session_time)
}
