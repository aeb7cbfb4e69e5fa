//! Firestore REST typed values <-> plain JSON.

use super::{Fields, PlatformError, PlatformResult};

use serde_json::{json, Map, Value};

pub fn encode(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) if items.is_empty() => json!({ "arrayValue": {} }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(encode).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(fields) => json!({ "mapValue": { "fields": encode_fields(fields) } }),
    }
}

pub fn encode_fields(fields: &Fields) -> Map<String, Value> {
    fields
        .iter()
        .map(|(name, value)| (name.clone(), encode(value)))
        .collect()
}

/// Encode a document body; only JSON objects are valid documents.
pub fn encode_document(data: &Value) -> PlatformResult<Value> {
    match data {
        Value::Object(fields) => Ok(json!({ "fields": encode_fields(fields) })),
        other => Err(PlatformError::InvalidDocument(format!(
            "document data must be an object, got {}",
            kind_name(other)
        ))),
    }
}

pub fn decode(value: &Value) -> PlatformResult<Value> {
    let Some((kind, inner)) = value.as_object().and_then(|o| o.iter().next()) else {
        return Err(PlatformError::Decode(format!("expected a typed value, got {}", value)));
    };

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => inner
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| malformed(kind, inner)),
        "integerValue" => match inner {
            // int64 travels as a decimal string
            Value::String(s) => s.parse::<i64>().map(Value::from).map_err(|_| malformed(kind, inner)),
            Value::Number(n) if n.is_i64() => Ok(inner.clone()),
            _ => Err(malformed(kind, inner)),
        },
        "doubleValue" => match inner {
            Value::Number(_) => Ok(inner.clone()),
            // non-finite doubles arrive as strings; json has no number for them
            Value::String(s) if matches!(s.as_str(), "NaN" | "Infinity" | "-Infinity") => Ok(Value::Null),
            _ => Err(malformed(kind, inner)),
        },
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner
            .as_str()
            .map(|s| Value::String(s.to_string()))
            .ok_or_else(|| malformed(kind, inner)),
        "geoPointValue" => Ok(json!({
            "latitude": inner.get("latitude").cloned().unwrap_or(json!(0.0)),
            "longitude": inner.get("longitude").cloned().unwrap_or(json!(0.0)),
        })),
        "arrayValue" => {
            let values = match inner.get("values") {
                Some(Value::Array(values)) => values.iter().map(decode).collect::<PlatformResult<_>>()?,
                Some(other) => return Err(malformed(kind, other)),
                None => Vec::new(),
            };
            Ok(Value::Array(values))
        }
        "mapValue" => match inner.get("fields") {
            Some(Value::Object(fields)) => decode_fields(fields).map(Value::Object),
            Some(other) => Err(malformed(kind, other)),
            None => Ok(Value::Object(Map::new())),
        },
        other => Err(PlatformError::Decode(format!("unsupported value kind {}", other))),
    }
}

pub fn decode_fields(fields: &Map<String, Value>) -> PlatformResult<Fields> {
    fields
        .iter()
        .map(|(name, value)| Ok((name.clone(), decode(value)?)))
        .collect()
}

fn malformed(kind: &str, inner: &Value) -> PlatformError {
    PlatformError::Decode(format!("malformed {}: {}", kind, inner))
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
