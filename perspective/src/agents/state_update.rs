//! State update trigger: infer the smallest snapshot patch for this turn.

use anyhow::Result;
use chrono::Utc;
use serde_json::{Map, Value, json};
use tracing::{debug, info, instrument};

use crate::core::snapshot::{PatchRules, sanitize_patch};
use crate::core::types::{Snapshot, SnapshotPatch};
use crate::io::config::PerspectiveConfig;
use crate::io::model::ModelClient;
use crate::io::prompt::PromptEngine;

use super::call_model;

pub const ROLE: &str = "trigger_state_update";

pub struct StateUpdateTrigger<M> {
    model: M,
    temperature: f32,
    allowed_keys: Vec<String>,
    max_value_chars: usize,
    system_prompt: String,
}

impl<M: ModelClient> StateUpdateTrigger<M> {
    pub fn new(model: M, config: &PerspectiveConfig) -> Result<Self> {
        let system_prompt = PromptEngine::new()?.render_state_update(config)?;
        Ok(Self {
            model,
            temperature: config.state_update.temperature,
            allowed_keys: config.state_update.allowed_keys.clone(),
            max_value_chars: config.state_update.max_value_chars,
            system_prompt,
        })
    }

    pub fn infer_updates(&self, user_text: &str, history: &[Value], snapshot: &Snapshot) -> SnapshotPatch {
        self.infer_updates_at(user_text, history, snapshot, Utc::now().timestamp())
    }

    /// Infer a patch, using `now_ts` (epoch seconds) for the heartbeat when
    /// the model does not supply one.
    #[instrument(skip_all, fields(history = history.len()))]
    pub fn infer_updates_at(
        &self,
        user_text: &str,
        history: &[Value],
        snapshot: &Snapshot,
        now_ts: i64,
    ) -> SnapshotPatch {
        let payload = json!({
            "system": self.system_prompt,
            "user_text": user_text,
            "history": history,
            "snapshot": snapshot,
        });
        let reply = call_model(&self.model, ROLE, &payload, self.temperature);
        let parsed = parse_reply_object(&reply);
        if parsed.is_none() {
            debug!(reply_len = reply.len(), "state reply is not a json object");
        }

        let rules = PatchRules {
            allowed_keys: &self.allowed_keys,
            max_value_chars: self.max_value_chars,
        };
        let patch = sanitize_patch(parsed, rules, now_ts, user_text);
        info!(keys = ?patch.keys().collect::<Vec<_>>(), "snapshot patch inferred");
        patch
    }
}

/// Pull a JSON object out of a state reply: fenced, bare, or wrapped in prose.
fn parse_reply_object(text: &str) -> Option<Map<String, Value>> {
    let body = unfence(text.trim());
    if body.is_empty() {
        return None;
    }
    if let Ok(Value::Object(object)) = serde_json::from_str::<Value>(body) {
        return Some(object);
    }
    let open = body.find('{')?;
    let close = body.rfind('}')?;
    if close <= open {
        return None;
    }
    match serde_json::from_str::<Value>(&body[open..=close]) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}

fn unfence(text: &str) -> &str {
    let mut body = text;
    if let Some(rest) = body.strip_prefix("```") {
        body = match rest.get(..4) {
            Some(tag) if tag.eq_ignore_ascii_case("json") => &rest[4..],
            _ => rest,
        };
        body = body.trim_start();
    }
    if let Some(rest) = body.trim_end().strip_suffix("```") {
        body = rest.trim_end();
    }
    body
}
