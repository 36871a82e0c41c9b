//! The three model-backed triggers.
//!
//! Each trigger makes exactly one model call per invocation and never
//! returns an error: transport failures degrade to the trigger's fallback.

use serde_json::Value;
use tracing::warn;

use crate::io::model::ModelClient;

pub mod generate;
pub mod movement;
pub mod state_update;

/// Call the model, logging and absorbing any failure as an empty reply.
pub(crate) fn call_model<M: ModelClient>(
    model: &M,
    role: &str,
    payload: &Value,
    temperature: f32,
) -> String {
    match model.call(role, payload, temperature) {
        Ok(reply) => reply,
        Err(err) => {
            warn!(role, error = %format!("{err:#}"), "model call failed, using fallback");
            String::new()
        }
    }
}

/// The last `n` entries of `history`.
pub(crate) fn history_tail(history: &[Value], n: usize) -> &[Value] {
    &history[history.len().saturating_sub(n)..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedModel;
    use anyhow::anyhow;
    use serde_json::json;

    #[test]
    fn history_tail_keeps_most_recent() {
        let history = vec![json!(1), json!(2), json!(3)];
        assert_eq!(history_tail(&history, 2), &[json!(2), json!(3)]);
        assert_eq!(history_tail(&history, 10).len(), 3);
        assert!(history_tail(&history, 0).is_empty());
    }

    #[test]
    fn failed_call_becomes_empty_reply() {
        let model = ScriptedModel::new();
        model.push_err(anyhow!("backend down"));
        assert_eq!(call_model(&model, "role", &json!({}), 0.1), "");
        assert_eq!(model.requests().len(), 1);
    }
}
