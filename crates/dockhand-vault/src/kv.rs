//! KV secret payload handling.

use serde_json::Value;
use std::collections::HashMap;

/// Flatten a KV read response into a string map.
///
/// The v2 engine nests the payload under an inner `data` key next to a
/// `metadata` object; v1 puts the payload directly under `data`. Both
/// shapes are accepted without configuration.
pub(crate) fn flatten_secret_data(body: &Value) -> HashMap<String, String> {
    let payload = match body.get("data") {
        Some(outer) => {
            let versioned = outer.get("metadata").is_some_and(Value::is_object)
                && outer.get("data").is_some_and(Value::is_object);
            if versioned {
                outer.get("data").unwrap_or(&Value::Null)
            } else {
                outer
            }
        }
        None => &Value::Null,
    };

    let mut flat = HashMap::new();
    if let Value::Object(map) = payload {
        for (key, value) in map {
            flat.insert(key.clone(), coerce_to_string(value));
        }
    }
    flat
}

/// Values keep their source representation but always read as strings.
fn coerce_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
