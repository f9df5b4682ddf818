//! Lenient extraction of the prediction array from model output.
//!
//! Models wrap the JSON they were asked for in prose or Markdown fences, so
//! the answer is searched for rather than parsed directly:
//!
//! 1. strip code fence markers and try the whole text as a JSON array;
//! 2. try each `[` in order and take the first position where a complete
//!    JSON array parses (trailing prose is ignored);
//! 3. fall back to the greedy substring between the first `[` and the last `]`.
//!
//! Each step runs on the fence-stripped text first, then on the raw text.
//!
//! This is a heuristic. Output that never contains a well-formed array (or
//! contains a decoy array before the real one) still fails or misparses.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::result::{AiError, Confidence, PredictionEntry};

/// Locate and parse the first JSON array in `text`.
pub fn extract_json_array(text: &str) -> Result<Vec<Value>, AiError> {
    let cleaned = strip_code_fences(text);
    let candidates = [cleaned.trim(), text.trim()];

    for candidate in candidates {
        if let Some(items) = first_complete_array(candidate) {
            return Ok(items);
        }
    }

    bracketed_fallback(candidates[0]).or_else(|err| bracketed_fallback(candidates[1]).map_err(|_| err))
}

fn first_complete_array(text: &str) -> Option<Vec<Value>> {
    if let Ok(items) = serde_json::from_str::<Vec<Value>>(text) {
        return Some(items);
    }

    text.match_indices('[').find_map(|(start, _)| {
        let mut stream = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
        match stream.next() {
            Some(Ok(Value::Array(items))) => Some(items),
            _ => None,
        }
    })
}

fn bracketed_fallback(text: &str) -> Result<Vec<Value>, AiError> {
    let (Some(start), Some(end)) = (text.find('['), text.rfind(']')) else {
        return Err(AiError::InvalidResponse("no JSON array found in response".to_string()));
    };
    if end < start {
        return Err(AiError::InvalidResponse("no JSON array found in response".to_string()));
    }
    serde_json::from_str::<Vec<Value>>(&text[start..=end])
        .map_err(|e| AiError::InvalidResponse(e.to_string()))
}

/// Remove fence markers (and an info string such as `json` right after an
/// opening fence); whatever shares the line with a fence is kept.
fn strip_code_fences(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find("```") {
        out.push_str(&rest[..pos]);
        rest = &rest[pos + 3..];
        let tag = rest
            .find(|c: char| !c.is_ascii_alphanumeric())
            .unwrap_or(rest.len());
        rest = &rest[tag..];
    }
    out.push_str(rest);
    out
}

/// Map one array element to a prediction; non-objects are skipped.
pub fn prediction_from_value(value: &Value, generated_at: DateTime<Utc>) -> Option<PredictionEntry> {
    let object = value.as_object()?;
    Some(PredictionEntry {
        generated_at,
        item: text_field(object.get("item")),
        confidence: Confidence::from_json(object.get("confidence")),
        notes: text_field(object.get("notes")),
    })
}

fn text_field(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Full pipeline: locate the array and convert every object element.
pub fn parse_predictions(text: &str, generated_at: DateTime<Utc>) -> Result<Vec<PredictionEntry>, AiError> {
    Ok(extract_json_array(text)?
        .iter()
        .filter_map(|v| prediction_from_value(v, generated_at))
        .collect())
}
