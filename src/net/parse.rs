//! Parsing helpers for event payload handling.

#[cfg(test)]
#[path = "parse_test.rs"]
mod parse_test;

use chrono::{DateTime, NaiveDateTime};
use serde_json::Value;

pub fn pick_str<'a>(data: &'a Value, keys: &[&str]) -> Option<&'a str> {
    for key in keys {
        if let Some(value) = data.get(key).and_then(Value::as_str) {
            return Some(value);
        }
    }
    None
}

pub fn pick_number(data: &Value, keys: &[&str]) -> Option<f64> {
    for key in keys {
        if let Some(value) = data.get(key).and_then(Value::as_f64) {
            return Some(value);
        }
    }
    None
}

pub fn pick_bool(data: &Value, keys: &[&str]) -> Option<bool> {
    for key in keys {
        if let Some(value) = data.get(key).and_then(Value::as_bool) {
            return Some(value);
        }
    }
    None
}

/// Resolve a dotted path (`io.in.flow`) through nested objects.
///
/// A literal key containing dots is preferred over the nested walk, so
/// payloads keyed by full channel names still resolve.
pub fn lookup_path<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    if let Some(direct) = data.get(path) {
        return Some(direct);
    }
    let mut current = data;
    for segment in path.split('.') {
        if segment.is_empty() {
            return None;
        }
        current = current.get(segment)?;
    }
    Some(current)
}

/// Coerce a payload value into a chart sample.
///
/// `Some(Some(v))` is a point, `Some(None)` an explicit gap (JSON `null`),
/// `None` a value that must not be appended at all. Objects are unwrapped
/// through their `value` member.
pub fn coerce_sample(value: &Value) -> Option<Option<f64>> {
    match value {
        Value::Null => Some(None),
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()).map(Some),
        Value::Bool(b) => Some(Some(if *b { 1.0 } else { 0.0 })),
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Some(Some(v)),
            _ => None,
        },
        Value::Object(map) => map.get("value").and_then(|inner| match inner {
            Value::Object(_) => None,
            other => coerce_sample(other),
        }),
        Value::Array(_) => None,
    }
}

/// Parse an envelope timestamp into epoch milliseconds.
///
/// Numbers are taken as milliseconds; strings as RFC 3339, or as a naive
/// ISO-8601 date-time in UTC.
#[allow(clippy::cast_possible_truncation)]
pub fn parse_timestamp(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|v| v.is_finite()).map(|v| v.round() as i64)),
        Value::String(s) => parse_iso_millis(s.trim()),
        _ => None,
    }
}

fn parse_iso_millis(raw: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp_millis());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc().timestamp_millis());
        }
    }
    None
}

/// Envelope timestamp, or `fallback_ms` when absent or unparsable.
pub fn timestamp_or(value: Option<&Value>, fallback_ms: i64) -> i64 {
    value.and_then(parse_timestamp).unwrap_or(fallback_ms)
}
