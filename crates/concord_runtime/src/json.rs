//! Conversion between [`Value`] and JSON.
//!
//! Responses are printed as JSON, and `key=value` arguments typed at the REPL
//! are read as JSON when they parse as such, else as plain strings.

use concord_foundation::{Fields, List, Value};
use serde_json::{Map, Number};

/// Converts a value to JSON.
///
/// Non-finite floats have no JSON form and become `null`.
#[must_use]
pub fn to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Nil => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(n) => serde_json::Value::Number(Number::from(*n)),
        Value::Float(f) => Number::from_f64(*f).map_or(serde_json::Value::Null, serde_json::Value::Number),
        Value::String(s) => serde_json::Value::String(s.to_string()),
        Value::List(items) => serde_json::Value::Array(items.iter().map(to_json).collect()),
        Value::Record(fields) => serde_json::Value::Object(fields_to_map(fields)),
    }
}

fn fields_to_map(fields: &Fields) -> Map<String, serde_json::Value> {
    fields
        .iter()
        .map(|(k, v)| (k.to_string(), to_json(v)))
        .collect()
}

/// Converts JSON to a value.
///
/// Integers that fit in `i64` stay integers; other numbers become floats.
#[must_use]
pub fn from_json(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Nil,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => n
            .as_i64()
            .map(Value::Int)
            .or_else(|| n.as_f64().map(Value::Float))
            .unwrap_or(Value::Nil),
        serde_json::Value::String(s) => Value::from(s.as_str()),
        serde_json::Value::Array(items) => Value::List(items.iter().map(from_json).collect::<List<_>>()),
        serde_json::Value::Object(map) => Value::Record(
            map.iter()
                .fold(Fields::new(), |acc, (k, v)| acc.with(k.as_str(), from_json(v))),
        ),
    }
}

/// Reads one REPL argument value.
///
/// `3`, `true`, `"quoted"` and `{"a":1}` are JSON; anything else, such as
/// `q1` or `Foo`, is taken verbatim as a string.
#[must_use]
pub fn parse_arg(text: &str) -> Value {
    serde_json::from_str::<serde_json::Value>(text)
        .map_or_else(|_| Value::from(text), |json| from_json(&json))
}

/// Renders a value as compact JSON text.
#[must_use]
pub fn render(value: &Value) -> String {
    to_json(value).to_string()
}
