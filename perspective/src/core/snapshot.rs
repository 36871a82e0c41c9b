//! Cleaning rules for model-proposed snapshot updates.

use serde_json::{Map, Value};
use tracing::debug;

use crate::core::types::{HEARTBEAT_TEXT_KEY, HEARTBEAT_TS_KEY, SnapshotPatch};

/// Which keys a patch may carry and how long string values may be.
#[derive(Debug, Clone, Copy)]
pub struct PatchRules<'a> {
    /// Writable keys besides the heartbeat fields.
    pub allowed_keys: &'a [String],
    /// Strings longer than this many characters are cut.
    pub max_value_chars: usize,
}

impl PatchRules<'_> {
    fn allows(&self, key: &str) -> bool {
        is_heartbeat_key(key) || self.allowed_keys.iter().any(|allowed| allowed == key)
    }
}

pub fn is_heartbeat_key(key: &str) -> bool {
    key == HEARTBEAT_TS_KEY || key == HEARTBEAT_TEXT_KEY
}

/// Turn a parsed reply into a patch that always carries the heartbeat fields.
///
/// Keys outside the allow-list are dropped. Values that are null, blank,
/// `"null"` or `"none"` are dropped; strings are trimmed and cut to
/// `max_value_chars`; numbers and booleans pass through; anything else is
/// stringified. `_last_user_text` is always `user_text`; `_last_update_ts` is
/// kept only when the reply carries a non-negative integer.
pub fn sanitize_patch(
    reply: Option<Map<String, Value>>,
    rules: PatchRules<'_>,
    now_ts: i64,
    user_text: &str,
) -> SnapshotPatch {
    let Some(mut fields) = reply else {
        return SnapshotPatch::heartbeat(now_ts, user_text);
    };

    let ts_ok = fields
        .get(HEARTBEAT_TS_KEY)
        .is_some_and(|ts| ts.as_u64().is_some());
    if !ts_ok {
        fields.insert(HEARTBEAT_TS_KEY.to_string(), Value::from(now_ts));
    }
    fields.insert(
        HEARTBEAT_TEXT_KEY.to_string(),
        Value::String(user_text.to_string()),
    );

    let mut cleaned = Map::new();
    for (key, value) in fields {
        if !rules.allows(&key) {
            debug!(%key, "dropped key outside allow-list");
            continue;
        }
        if is_heartbeat_key(&key) {
            cleaned.insert(key, value);
            continue;
        }
        match clean_value(value, rules.max_value_chars) {
            Some(value) => {
                cleaned.insert(key, value);
            }
            None => debug!(%key, "dropped empty value"),
        }
    }

    if cleaned.is_empty() {
        return SnapshotPatch::heartbeat(now_ts, user_text);
    }
    SnapshotPatch::from_fields(cleaned)
}

fn clean_value(value: Value, max_chars: usize) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Bool(_) | Value::Number(_) => Some(value),
        Value::String(text) => clean_text(&text, max_chars).map(Value::String),
        other => clean_text(&other.to_string(), max_chars).map(Value::String),
    }
}

fn clean_text(text: &str, max_chars: usize) -> Option<String> {
    let text = text.trim();
    if text.is_empty() || text.eq_ignore_ascii_case("null") || text.eq_ignore_ascii_case("none") {
        return None;
    }
    Some(text.chars().take(max_chars).collect())
}
