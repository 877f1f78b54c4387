//! Conversion between plain JSON and Firestore's typed value encoding
//!
//! The REST API wraps every value in a single-key object naming its type
//! (`{"stringValue": "x"}`, `{"integerValue": "42"}`, ...). Integers travel
//! as decimal strings. Whole floating point numbers are stored as integers,
//! matching how the JavaScript SDK treats numbers that happen to be whole.

use crate::error::{ImportError, Result};
use crate::store::Fields;
use serde_json::{json, Map, Number, Value};

/// Largest integer a double represents exactly (2^53 - 1)
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Encode a JSON value as a Firestore `Value`
pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => encode_number(n),
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            if items.is_empty() {
                json!({ "arrayValue": {} })
            } else {
                let values: Vec<Value> = items.iter().map(encode_value).collect();
                json!({ "arrayValue": { "values": values } })
            }
        }
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

fn encode_number(n: &Number) -> Value {
    if let Some(i) = n.as_i64() {
        return json!({ "integerValue": i.to_string() });
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER => {
            json!({ "integerValue": (f as i64).to_string() })
        }
        Some(f) => json!({ "doubleValue": f }),
        None => json!({ "doubleValue": n }),
    }
}

/// Encode every field of a document
pub fn encode_fields(fields: &Fields) -> Value {
    let encoded: Map<String, Value> = fields
        .iter()
        .map(|(key, value)| (key.clone(), encode_value(value)))
        .collect();
    Value::Object(encoded)
}

/// Decode a Firestore `Value` back to plain JSON
///
/// Timestamps, references and bytes decode to their string form; geo points
/// to a `{latitude, longitude}` map.
pub fn decode_value(value: &Value) -> Result<Value> {
    let typed = value
        .as_object()
        .and_then(|map| map.iter().next())
        .map(|(kind, inner)| (kind.as_str(), inner))
        .ok_or_else(|| ImportError::storage(format!("malformed Firestore value: {}", value)))?;

    match typed {
        ("nullValue", _) => Ok(Value::Null),
        ("booleanValue", b) => Ok(b.clone()),
        ("integerValue", Value::String(s)) => s
            .parse::<i64>()
            .map(Value::from)
            .map_err(|e| ImportError::storage(format!("bad integerValue '{}': {}", s, e))),
        ("integerValue", n @ Value::Number(_)) => Ok(n.clone()),
        ("doubleValue", n) => Ok(n.clone()),
        ("stringValue", s)
        | ("timestampValue", s)
        | ("referenceValue", s)
        | ("bytesValue", s) => Ok(s.clone()),
        ("geoPointValue", point) => Ok(point.clone()),
        ("arrayValue", array) => {
            let values = match array.get("values") {
                Some(Value::Array(values)) => {
                    values.iter().map(decode_value).collect::<Result<Vec<_>>>()?
                }
                _ => Vec::new(),
            };
            Ok(Value::Array(values))
        }
        ("mapValue", map) => {
            let fields = match map.get("fields") {
                Some(Value::Object(fields)) => decode_fields(fields)?,
                _ => Fields::new(),
            };
            Ok(Value::Object(fields))
        }
        (kind, _) => Err(ImportError::storage(format!(
            "unsupported Firestore value type '{}'",
            kind
        ))),
    }
}

/// Decode the `fields` object of a Firestore document
pub fn decode_fields(fields: &Map<String, Value>) -> Result<Fields> {
    fields
        .iter()
        .map(|(key, value)| Ok((key.clone(), decode_value(value)?)))
        .collect()
}
