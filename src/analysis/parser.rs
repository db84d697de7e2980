//! Embedded JSON extraction.
//!
//! Critics are asked for JSON but routinely wrap it in prose or code
//! fences. Finding nothing is a normal outcome, not an error.

use serde_json::{Map, Value};

/// Locate and parse a JSON object embedded in a critic response.
///
/// The whole text is tried first, then the span from the first `{` to the
/// last `}`. Returns `None` when neither parses to an object.
pub fn extract_json_object(text: &str) -> Option<Map<String, Value>> {
    if !text.contains('{') {
        return None;
    }

    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(text) {
        return Some(map);
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }

    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}
