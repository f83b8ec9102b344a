//! List normalization: the one place loosely-typed list fields become `Vec<String>`.
//!
//! Candidate records and filter strings arrive as arrays, comma/pipe-delimited
//! strings, single scalars, or nothing at all. Everything downstream works on
//! the canonical ordered, deduplicated list produced here.

use serde_json::Value;

/// Object keys consulted, in order, when a list element is an object.
const OBJECT_LABEL_KEYS: &[&str] = &["name", "label", "value", "language", "skill"];

/// Normalizes any JSON value into an ordered, deduplicated list of trimmed strings.
///
/// - array → one item per element (strings are not split further)
/// - string → split on `,` and `|`
/// - number / bool → a single item
/// - null / object without a label → empty
///
/// Dedup is first-occurrence-wins and case-sensitive.
pub fn normalize_list(value: &Value) -> Vec<String> {
    let raw: Vec<String> = match value {
        Value::Array(items) => items.iter().filter_map(scalar_text).collect(),
        Value::String(s) => return split_delimited(s),
        Value::Number(_) | Value::Bool(_) => scalar_text(value).into_iter().collect(),
        Value::Object(_) => scalar_text(value).into_iter().collect(),
        Value::Null => Vec::new(),
    };
    dedup_preserving_order(raw)
}

/// Splits a comma/pipe-delimited string into trimmed, non-empty, deduplicated items.
pub fn split_delimited(s: &str) -> Vec<String> {
    dedup_preserving_order(
        s.split([',', '|'])
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect(),
    )
}

/// Renders a scalar (or labelled object) as trimmed text. Empty text yields `None`.
pub fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Object(map) => OBJECT_LABEL_KEYS
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
        Value::Array(_) | Value::Null => String::new(),
    };
    (!text.is_empty()).then_some(text)
}

/// Returns the first non-empty text found under any of `keys`.
pub fn first_text(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| value.get(*key))
        .find_map(|v| match v {
            Value::String(_) | Value::Number(_) => scalar_text(v),
            _ => None,
        })
}

/// Case-insensitive substring check. A blank needle never matches.
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    let needle = needle.trim();
    !needle.is_empty() && haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn dedup_preserving_order(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}
