//! Best-effort recovery of a JSON object from free-text model output.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

static LEADING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^```(?:json)?\s*").unwrap());
static TRAILING_FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*```$").unwrap());

/// Extract a JSON object from `text`.
///
/// Tries, in order: strip a surrounding code fence, parse the whole string,
/// parse the greedy span from the first `{` to the last `}`. Anything that is
/// not an object (arrays, scalars, malformed spans) yields `None`.
pub fn extract_json_object(text: &str) -> Option<Map<String, Value>> {
    let unfenced = strip_fence(text.trim());

    if let Some(object) = parse_object(&unfenced) {
        return Some(object);
    }

    let span = brace_span(&unfenced)?;
    let object = parse_object(span);
    if object.is_some() {
        debug!(span_len = span.len(), "recovered json object from brace span");
    } else {
        debug!(span_len = span.len(), "brace span is not a json object");
    }
    object
}

fn strip_fence(text: &str) -> String {
    let without_leading = LEADING_FENCE.replace(text, "");
    TRAILING_FENCE.replace(&without_leading, "").into_owned()
}

/// Greedy `{ ... }` span: first opening brace through last closing brace.
fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

fn parse_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn extract(text: &str) -> Option<Value> {
        extract_json_object(text).map(Value::Object)
    }

    #[test]
    fn minified_object_is_returned_unchanged() {
        let text = r#"{"move":true,"next_node_id":"N1","need_new_tree":false}"#;
        let first = extract(text).expect("object");
        assert_eq!(
            first,
            json!({"move": true, "next_node_id": "N1", "need_new_tree": false})
        );
        let again = extract(&first.to_string()).expect("object");
        assert_eq!(again, first);
    }

    #[test]
    fn strips_json_code_fence() {
        let text = "```json\n{\"a\": 1}\n```";
        assert_eq!(extract(text), Some(json!({"a": 1})));

        let text = "```JSON\n{\"a\": [1, 2]}```";
        assert_eq!(extract(text), Some(json!({"a": [1, 2]})));

        let text = "```\n{\"a\": null}\n```";
        assert_eq!(extract(text), Some(json!({"a": null})));
    }

    #[test]
    fn recovers_object_wrapped_in_prose() {
        let text = "Sure! Here is the tree:\n{\"root_id\": \"N0\", \"nodes\": {}}\nHope it helps.";
        assert_eq!(extract(text), Some(json!({"root_id": "N0", "nodes": {}})));
    }

    #[test]
    fn prose_without_braces_yields_none() {
        assert_eq!(extract("I am not sure what you mean."), None);
        assert_eq!(extract(""), None);
    }

    #[test]
    fn non_object_json_yields_none() {
        assert_eq!(extract("[1, 2, 3]"), None);
        assert_eq!(extract("\"just a string\""), None);
        assert_eq!(extract("42"), None);
    }

    #[test]
    fn malformed_span_yields_none() {
        assert_eq!(extract("prefix {\"a\": 1,} suffix"), None);
        assert_eq!(extract("} backwards {"), None);
    }

    #[test]
    fn greedy_span_covers_two_objects_and_fails() {
        // First '{' through last '}' spans both objects, which is not valid JSON.
        assert_eq!(extract("{\"a\": 1} and {\"b\": 2}"), None);
    }
}
