//! Assistant-text extraction from schema-flexible SDK responses.
//!
//! Agent services disagree on response shape, and the same service drifts
//! between versions. Extraction tries the shapes we have seen, most specific
//! first, and ends with a bounded recursive search so an unknown shape still
//! yields something rather than nothing.

use serde_json::Value;

/// Depth limit for the fallback recursive search.
///
/// Deserialized JSON is a tree, so the bound only caps work on pathologically
/// nested payloads; it is not guarding against cycles.
pub const MAX_SEARCH_DEPTH: usize = 6;

/// Direct string fields checked before any structural strategy.
const DIRECT_KEYS: [&str; 4] = ["text", "output_text", "final_output", "response"];

/// Pull the assistant's final text out of a response value.
///
/// Strategies, in order: well-known direct fields, an `output` array of
/// items, a `messages` array, and last a depth-bounded recursive search for
/// any `text` or `content` string.
pub fn extract_assistant_text(value: &Value) -> Option<String> {
    for key in DIRECT_KEYS {
        if let Some(Value::String(s)) = value.get(key)
            && !s.trim().is_empty()
        {
            return Some(s.clone());
        }
    }
    if let Some(Value::Array(items)) = value.get("output")
        && let Some(text) = from_item_array(items)
    {
        return Some(text);
    }
    if let Some(Value::Array(items)) = value.get("messages")
        && let Some(text) = from_item_array(items)
    {
        return Some(text);
    }
    find_text_deep(value, 0)
}

/// Scan an item or message array from the end, preferring assistant output.
fn from_item_array(items: &[Value]) -> Option<String> {
    for item in items.iter().rev() {
        let role = item.get("role").and_then(Value::as_str);
        let kind = item.get("type").and_then(Value::as_str);
        if (role == Some("assistant") || kind == Some("message"))
            && let Some(text) = item_text(item)
        {
            return Some(text);
        }
    }
    items.iter().rev().find_map(item_text)
}

/// Text carried by one item: a `content` string, a `content` array of text
/// parts, or a bare `text` field.
fn item_text(item: &Value) -> Option<String> {
    match item.get("content") {
        Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.clone()),
        Some(Value::Array(parts)) => {
            let mut collected = Vec::new();
            for part in parts {
                if let Some(Value::String(s)) = part.get("text") {
                    collected.push(s.as_str());
                } else if let Value::String(s) = part {
                    collected.push(s.as_str());
                }
            }
            if !collected.is_empty() {
                return Some(collected.join(""));
            }
        },
        _ => {},
    }
    match item.get("text") {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn find_text_deep(value: &Value, depth: usize) -> Option<String> {
    if depth > MAX_SEARCH_DEPTH {
        return None;
    }
    match value {
        Value::Object(map) => {
            for key in ["text", "content"] {
                if let Some(Value::String(s)) = map.get(key)
                    && !s.trim().is_empty()
                {
                    return Some(s.clone());
                }
            }
            map.values()
                .find_map(|child| find_text_deep(child, depth.saturating_add(1)))
        },
        Value::Array(items) => items
            .iter()
            .rev()
            .find_map(|item| find_text_deep(item, depth.saturating_add(1))),
        _ => None,
    }
}
