//! Loose truthiness for flags the model may emit as strings or numbers.
//!
//! Stricter than plain "non-empty string is true": spelled-out negatives such
//! as `"false"`, `"none"` or `"stay"` read as false, so `{"need_new_tree":
//! "false"}` keeps the current tree and `"move": "stay"` stays.

use serde_json::Value;

/// String spellings that read as "no" even though they are non-empty.
const FALSY_WORDS: &[&str] = &["false", "no", "none", "null", "stay", "0"];

/// Interpret a model-supplied flag.
///
/// Booleans are themselves, null is false, numbers are true when non-zero,
/// strings are true unless blank or a falsy word, containers are true when
/// non-empty.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => {
            let text = text.trim();
            !text.is_empty()
                && !FALSY_WORDS
                    .iter()
                    .any(|word| text.eq_ignore_ascii_case(word))
        }
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}
