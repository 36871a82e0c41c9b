//! Perspective move trigger: advance, stay, or ask for a new tree.

use anyhow::Result;
use serde_json::{Value, json};
use tracing::{info, instrument};

use crate::core::extract::extract_json_object;
use crate::core::movement::reconcile_move;
use crate::core::types::{MoveDecision, Node, Snapshot, Tree};
use crate::io::config::PerspectiveConfig;
use crate::io::model::ModelClient;
use crate::io::prompt::PromptEngine;

use super::{call_model, history_tail};

pub const ROLE: &str = "trigger_perspective_move";

pub struct PerspectiveMoveTrigger<M> {
    model: M,
    temperature: f32,
    history_turns: usize,
    system_prompt: String,
}

impl<M: ModelClient> PerspectiveMoveTrigger<M> {
    pub fn new(model: M, config: &PerspectiveConfig) -> Result<Self> {
        let system_prompt = PromptEngine::new()?.render_movement()?;
        Ok(Self {
            model,
            temperature: config.movement.temperature,
            history_turns: config.movement.history_turns,
            system_prompt,
        })
    }

    /// Decide how the conversation moves from `current_node` this turn.
    ///
    /// The returned decision is always consistent: a new-tree request never
    /// moves, and an advance always targets one of `current_node`'s children.
    #[instrument(skip_all, fields(node = %current_node.id))]
    pub fn decide_move(
        &self,
        current_node: &Node,
        user_text: &str,
        ai_text: &str,
        snapshot: &Snapshot,
        talk_history: &[Value],
        full_tree: &Tree,
    ) -> MoveDecision {
        let payload = json!({
            "system_prompt": self.system_prompt,
            "current_node": current_node,
            "user_text": user_text,
            "ai_text": ai_text,
            "snapshot": snapshot,
            "talk_history_tail": history_tail(talk_history, self.history_turns),
            "full_tree_meta": {
                "tree_id": full_tree.tree_id,
                "root_id": full_tree.root_id,
                "current_node_id": full_tree.current_node_id,
            },
            "full_tree_nodes": full_tree.nodes,
        });
        let reply = call_model(&self.model, ROLE, &payload, self.temperature);
        let parsed = extract_json_object(&reply);

        let decision = reconcile_move(parsed.as_ref(), &current_node.children);
        info!(
            moves = decision.moves(),
            next = ?decision.next_node_id(),
            need_new_tree = decision.need_new_tree(),
            "move decided"
        );
        decision
    }
}
