//! One conversational turn: update the snapshot, then keep, advance or
//! replace the perspective tree.

use anyhow::Result;
use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::json;
use tracing::{info, instrument};

use crate::agents::generate::PerspectiveGenerateEngine;
use crate::agents::movement::PerspectiveMoveTrigger;
use crate::agents::state_update::StateUpdateTrigger;
use crate::core::types::{MoveDecision, MoveOutcome, SnapshotPatch, Tree};
use crate::io::config::PerspectiveConfig;
use crate::io::model::ModelClient;
use crate::io::session::Session;

/// The three triggers sharing one model backend.
pub struct Engines<M> {
    pub generate: PerspectiveGenerateEngine<M>,
    pub movement: PerspectiveMoveTrigger<M>,
    pub state_update: StateUpdateTrigger<M>,
    history_limit: usize,
}

impl<M: ModelClient + Clone> Engines<M> {
    pub fn new(model: M, config: &PerspectiveConfig) -> Result<Self> {
        Ok(Self {
            generate: PerspectiveGenerateEngine::new(model.clone(), config)?,
            movement: PerspectiveMoveTrigger::new(model.clone(), config)?,
            state_update: StateUpdateTrigger::new(model, config)?,
            history_limit: config.session.history_limit,
        })
    }
}

/// How the session's tree changed during a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeChange {
    Generated { tree_id: String, reason: String },
    Advanced { from: String, to: String },
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnOutcome {
    pub patch: SnapshotPatch,
    /// `None` when no tree existed before the turn.
    pub decision: Option<MoveDecision>,
    pub change: TreeChange,
    pub current_node_id: String,
}

const INITIAL_TREE_REASON: &str = "initial tree";
const MISSING_NODE_REASON: &str = "current node missing";

/// Run one turn against `session`, mutating it in place.
#[instrument(skip_all)]
pub fn run_turn<M: ModelClient>(
    engines: &Engines<M>,
    session: &mut Session,
    user_text: &str,
    ai_text: &str,
    now: DateTime<Local>,
) -> TurnOutcome {
    let patch = engines.state_update.infer_updates_at(
        user_text,
        &session.history,
        &session.snapshot,
        now.timestamp(),
    );
    patch.apply_to(&mut session.snapshot);

    let generate = |session: &Session| {
        engines.generate.generate_tree_at(
            user_text,
            &session.snapshot,
            &session.history,
            now.naive_local(),
        )
    };

    let (decision, change, tree) = match session.tree.take() {
        None => {
            let tree = generate(session);
            let change = TreeChange::Generated {
                tree_id: tree.tree_id.clone(),
                reason: INITIAL_TREE_REASON.to_string(),
            };
            (None, change, tree)
        }
        Some(tree) => match tree.current_node() {
            None => {
                let tree = generate(session);
                let change = TreeChange::Generated {
                    tree_id: tree.tree_id.clone(),
                    reason: MISSING_NODE_REASON.to_string(),
                };
                (None, change, tree)
            }
            Some(node) => {
                let decision = engines.movement.decide_move(
                    node,
                    user_text,
                    ai_text,
                    &session.snapshot,
                    &session.history,
                    &tree,
                );
                let (change, tree) = apply_decision(&decision, tree, || generate(session));
                (Some(decision), change, tree)
            }
        },
    };

    let current_node_id = tree.current_node_id.clone();
    session.tree = Some(tree);

    session.push_history(json!({"role": "user", "content": user_text}), engines.history_limit);
    if !ai_text.is_empty() {
        session.push_history(
            json!({"role": "assistant", "content": ai_text}),
            engines.history_limit,
        );
    }

    info!(change = ?change, current_node_id = %current_node_id, "turn complete");
    TurnOutcome {
        patch,
        decision,
        change,
        current_node_id,
    }
}

fn apply_decision(
    decision: &MoveDecision,
    mut tree: Tree,
    regenerate: impl FnOnce() -> Tree,
) -> (TreeChange, Tree) {
    match &decision.outcome {
        MoveOutcome::NewTree => {
            let tree = regenerate();
            let change = TreeChange::Generated {
                tree_id: tree.tree_id.clone(),
                reason: decision.reason.clone(),
            };
            (change, tree)
        }
        MoveOutcome::Advance(next) => {
            let from = tree.current_node_id.clone();
            if tree.apply_move(decision) {
                let change = TreeChange::Advanced {
                    from,
                    to: next.clone(),
                };
                (change, tree)
            } else {
                (TreeChange::Unchanged, tree)
            }
        }
        MoveOutcome::Stay => (TreeChange::Unchanged, tree),
    }
}
