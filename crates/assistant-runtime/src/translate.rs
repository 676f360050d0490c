//! Translation helpers shared by adapters whose wire format differs from
//! the canonical one (structured arguments, missing call ids).

use serde_json::{Map, Value, json};

/// Identifier given to calls from providers that issue none.
///
/// Only unique while a turn calls each function at most once.
pub fn synthesize_call_id(name: &str) -> String {
    format!("call_{name}")
}

/// Parse JSON argument text into a structured argument object.
///
/// Empty text is `{}`; anything that is not a JSON object is wrapped as
/// `{"args": <raw text>}`.
pub fn structured_args(arguments: &str) -> Value {
    if arguments.trim().is_empty() {
        return Value::Object(Map::new());
    }
    match serde_json::from_str::<Value>(arguments) {
        Ok(v @ Value::Object(_)) => v,
        _ => json!({ "args": arguments }),
    }
}

/// Tool output as a `functionResponse` payload. JSON objects pass through,
/// anything else is wrapped as `{"result": <text>}`.
pub fn structured_result(content: &str) -> Value {
    match serde_json::from_str::<Value>(content) {
        Ok(v @ Value::Object(_)) => v,
        _ => json!({ "result": content }),
    }
}
