//! Perspective generate engine: one model call per new tree.

use std::path::PathBuf;

use anyhow::Result;
use chrono::{Local, NaiveDateTime};
use serde_json::{Value, json};
use tracing::{info, instrument};

use crate::core::extract::extract_json_object;
use crate::core::repair::{FallbackIds, NodeDefaults, repair_tree};
use crate::core::types::{Snapshot, Tree};
use crate::io::config::PerspectiveConfig;
use crate::io::model::ModelClient;
use crate::io::prompt::PromptEngine;
use crate::io::tree_store::save_tree;

use super::{call_model, history_tail};

pub const ROLE: &str = "perspective_generate_engine";

/// Timestamp layout shared by `generated_at` and the default tree id.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Builds and persists a fresh perspective tree from the conversation so far.
pub struct PerspectiveGenerateEngine<M> {
    model: M,
    tree_dir: PathBuf,
    temperature: f32,
    history_turns: usize,
    defaults: NodeDefaults,
    system_prompt: String,
}

impl<M: ModelClient> PerspectiveGenerateEngine<M> {
    pub fn new(model: M, config: &PerspectiveConfig) -> Result<Self> {
        let system_prompt = PromptEngine::new()?.render_generate(config)?;
        Ok(Self {
            model,
            tree_dir: config.tree_dir.clone(),
            temperature: config.generate.temperature,
            history_turns: config.generate.history_turns,
            defaults: config.node_defaults(),
            system_prompt,
        })
    }

    /// Generate a tree stamped with the current local time.
    pub fn generate_tree(&self, user_text: &str, snapshot: &Snapshot, talk_history: &[Value]) -> Tree {
        self.generate_tree_at(user_text, snapshot, talk_history, Local::now().naive_local())
    }

    /// Generate a tree stamped with `now`.
    ///
    /// Always returns a structurally valid tree: unusable replies fall back
    /// to the fixed three-node chain. The tree is saved best-effort.
    #[instrument(skip_all, fields(history = talk_history.len()))]
    pub fn generate_tree_at(
        &self,
        user_text: &str,
        snapshot: &Snapshot,
        talk_history: &[Value],
        now: NaiveDateTime,
    ) -> Tree {
        let generated_at = now.format(TIMESTAMP_FORMAT).to_string();
        let tree_id = format!("tree_{generated_at}");

        let payload = json!({
            "system_prompt": self.system_prompt,
            "tree_id_hint": tree_id,
            "generated_at": generated_at,
            "user_text": user_text,
            "snapshot": snapshot,
            "talk_history": history_tail(talk_history, self.history_turns),
        });
        let reply = call_model(&self.model, ROLE, &payload, self.temperature);
        let candidate = extract_json_object(&reply).map(Value::Object);

        let tree = repair_tree(
            candidate,
            FallbackIds {
                tree_id: &tree_id,
                generated_at: &generated_at,
            },
            &self.defaults,
        );
        info!(tree_id = %tree.tree_id, nodes = tree.nodes.len(), "generated perspective tree");

        save_tree(&self.tree_dir, &tree);
        tree
    }
}
