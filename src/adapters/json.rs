//! Lookups into loosely structured JSON embedded in site pages

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use scraper::{Html, Selector};
use serde_json::Value;

/// String at a JSON pointer; numbers and booleans are rendered as text
pub fn text_at(value: &Value, pointer: &str) -> Option<String> {
    match value.pointer(pointer)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Integer at a JSON pointer, accepting numeric strings
pub fn int_at(value: &Value, pointer: &str) -> Option<i64> {
    match value.pointer(pointer)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn real_at(value: &Value, pointer: &str) -> Option<f64> {
    match value.pointer(pointer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn bool_at(value: &Value, pointer: &str) -> Option<bool> {
    value.pointer(pointer)?.as_bool()
}

/// Timestamp at a JSON pointer
///
/// Accepts RFC 3339 strings, naive ISO 8601 strings (taken as UTC) and Unix
/// timestamps in seconds.
pub fn time_at(value: &Value, pointer: &str) -> Option<DateTime<Utc>> {
    match value.pointer(pointer)? {
        Value::String(s) => parse_timestamp(s),
        Value::Number(n) => n.as_i64().and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
        _ => None,
    }
}

pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(s) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Escapes a string for use inside a JSON pointer
pub fn pointer_token(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

/// Parses the JSON in the `data-props` attribute of the first element
/// matching `selector`
pub fn data_props(document: &Html, selector: &str) -> Result<Value, String> {
    let parsed = Selector::parse(selector).map_err(|e| format!("bad selector {}: {:?}", selector, e))?;
    let element = document
        .select(&parsed)
        .next()
        .ok_or_else(|| format!("no element matching {}", selector))?;
    let props = element
        .value()
        .attr("data-props")
        .ok_or_else(|| format!("{} has no data-props", selector))?;
    serde_json::from_str(props).map_err(|e| format!("invalid data-props JSON: {}", e))
}
