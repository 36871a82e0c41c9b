//! Shared deterministic types for the perspective tree.
//!
//! These types define the contracts between the triggers, the repair pass and
//! the turn orchestrator. They never hold ambient state: a tree or snapshot is
//! passed in, inspected, and handed back.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Heartbeat field carrying the epoch seconds of the last snapshot update.
pub const HEARTBEAT_TS_KEY: &str = "_last_update_ts";
/// Heartbeat field carrying the verbatim latest user utterance.
pub const HEARTBEAT_TEXT_KEY: &str = "_last_user_text";

/// Structured summary of inferred user state.
pub type Snapshot = Map<String, Value>;

/// A perspective tree: a small graph of conversational stances.
///
/// Nodes are kept in a sorted map so serialized trees are stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    pub tree_id: String,
    pub root_id: String,
    pub current_node_id: String,
    pub generated_at: String,
    pub nodes: BTreeMap<String, Node>,
}

impl Tree {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn current_node(&self) -> Option<&Node> {
        self.node(&self.current_node_id)
    }

    /// Advance `current_node_id` when `decision` moves to a child of the current node.
    ///
    /// Returns true if the tree changed.
    pub fn apply_move(&mut self, decision: &MoveDecision) -> bool {
        let Some(next) = decision.next_node_id() else {
            return false;
        };
        let is_child = self
            .current_node()
            .is_some_and(|node| node.children.iter().any(|child| child == next));
        if !is_child || !self.nodes.contains_key(next) {
            return false;
        }
        self.current_node_id = next.to_string();
        true
    }
}

/// A single stance in the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub title: String,
    #[serde(flatten)]
    pub stance: Stance,
    pub children: Vec<String>,
    pub is_end: bool,
}

impl Node {
    /// Need tags (or phrases) regardless of stance variant.
    pub fn needs(&self) -> &[String] {
        self.stance.needs()
    }

    pub fn is_terminal(&self) -> bool {
        self.is_end || self.children.is_empty()
    }
}

/// The two node schemas produced by different generation prompts.
///
/// `Insight` nodes map onto the controlled core-need vocabulary; `Viewpoint`
/// nodes carry free-form need phrases. Both are kept as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Stance {
    Insight {
        philosophical_insight: String,
        core_need: Vec<String>,
    },
    Viewpoint {
        user_viewpoint: String,
        our_viewpoint: String,
        potential_need: Vec<String>,
    },
}

impl Stance {
    pub fn needs(&self) -> &[String] {
        match self {
            Stance::Insight { core_need, .. } => core_need,
            Stance::Viewpoint { potential_need, .. } => potential_need,
        }
    }

    /// The one-line insight or user viewpoint.
    pub fn summary(&self) -> &str {
        match self {
            Stance::Insight {
                philosophical_insight,
                ..
            } => philosophical_insight,
            Stance::Viewpoint { user_viewpoint, .. } => user_viewpoint,
        }
    }
}

/// What the move trigger decided for the current turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Advance to the named child of the current node.
    Advance(String),
    /// Remain on the current node.
    Stay,
    /// Discard the tree and generate a new one.
    NewTree,
}

/// Navigation decision, serialized as `{move, next_node_id, need_new_tree, reason}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "MoveDecisionWire")]
pub struct MoveDecision {
    pub outcome: MoveOutcome,
    pub reason: String,
}

impl MoveDecision {
    pub fn advance(next_node_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            outcome: MoveOutcome::Advance(next_node_id.into()),
            reason: reason.into(),
        }
    }

    pub fn stay(reason: impl Into<String>) -> Self {
        Self {
            outcome: MoveOutcome::Stay,
            reason: reason.into(),
        }
    }

    pub fn new_tree(reason: impl Into<String>) -> Self {
        Self {
            outcome: MoveOutcome::NewTree,
            reason: reason.into(),
        }
    }

    pub fn moves(&self) -> bool {
        matches!(self.outcome, MoveOutcome::Advance(_))
    }

    pub fn next_node_id(&self) -> Option<&str> {
        match &self.outcome {
            MoveOutcome::Advance(id) => Some(id),
            _ => None,
        }
    }

    pub fn need_new_tree(&self) -> bool {
        self.outcome == MoveOutcome::NewTree
    }
}

#[derive(Serialize)]
struct MoveDecisionWire {
    #[serde(rename = "move")]
    moves: bool,
    next_node_id: Option<String>,
    need_new_tree: bool,
    reason: String,
}

impl From<MoveDecision> for MoveDecisionWire {
    fn from(decision: MoveDecision) -> Self {
        Self {
            moves: decision.moves(),
            next_node_id: decision.next_node_id().map(str::to_string),
            need_new_tree: decision.need_new_tree(),
            reason: decision.reason,
        }
    }
}

/// Allow-listed key/value updates for a snapshot.
///
/// Always carries the heartbeat fields once produced by the state trigger.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SnapshotPatch(Map<String, Value>);

impl SnapshotPatch {
    /// Patch containing only the heartbeat fields.
    pub fn heartbeat(ts: i64, user_text: &str) -> Self {
        let mut fields = Map::new();
        fields.insert(HEARTBEAT_TS_KEY.to_string(), Value::from(ts));
        fields.insert(
            HEARTBEAT_TEXT_KEY.to_string(),
            Value::String(user_text.to_string()),
        );
        Self(fields)
    }

    pub(crate) fn from_fields(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Merge the patch into `snapshot`, overwriting keys it carries.
    pub fn apply_to(&self, snapshot: &mut Snapshot) {
        for (key, value) in &self.0 {
            snapshot.insert(key.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{tree_of, viewpoint_node};
    use serde_json::json;

    #[test]
    fn move_decision_serializes_flat_shape() {
        let decision = MoveDecision::advance("N1", "user picked a direction");
        assert_eq!(
            serde_json::to_value(&decision).expect("serialize"),
            json!({
                "move": true,
                "next_node_id": "N1",
                "need_new_tree": false,
                "reason": "user picked a direction",
            })
        );

        let decision = MoveDecision::new_tree("topic changed");
        assert_eq!(
            serde_json::to_value(&decision).expect("serialize"),
            json!({
                "move": false,
                "next_node_id": null,
                "need_new_tree": true,
                "reason": "topic changed",
            })
        );
    }

    #[test]
    fn node_serializes_stance_fields_inline() {
        let node = viewpoint_node("N0", &["N1"]);
        let value = serde_json::to_value(&node).expect("serialize");
        assert_eq!(value["user_viewpoint"], json!("N0 viewpoint"));
        assert_eq!(value["children"], json!(["N1"]));
        assert!(value.get("stance").is_none());

        let back: Node = serde_json::from_value(value).expect("deserialize");
        assert_eq!(back, node);
    }

    #[test]
    fn insight_stance_round_trips_through_untagged_form() {
        let value = json!({
            "id": "N0",
            "title": "t",
            "philosophical_insight": "insight",
            "core_need": ["理解机制"],
            "children": [],
            "is_end": true,
        });
        let node: Node = serde_json::from_value(value).expect("deserialize");
        assert!(matches!(node.stance, Stance::Insight { .. }));
        assert_eq!(node.needs(), ["理解机制".to_string()]);
        assert_eq!(node.stance.summary(), "insight");
    }

    #[test]
    fn apply_move_only_follows_children_of_current_node() {
        let mut tree = tree_of(
            "N0",
            vec![
                viewpoint_node("N0", &["N1"]),
                viewpoint_node("N1", &[]),
                viewpoint_node("N2", &[]),
            ],
        );

        assert!(!tree.apply_move(&MoveDecision::advance("N2", "not a child")));
        assert_eq!(tree.current_node_id, "N0");
        assert!(!tree.apply_move(&MoveDecision::stay("")));
        assert!(tree.apply_move(&MoveDecision::advance("N1", "child")));
        assert_eq!(tree.current_node_id, "N1");
    }

    #[test]
    fn snapshot_patch_merges_into_snapshot() {
        let mut snapshot = Snapshot::new();
        snapshot.insert("mood".to_string(), json!("calm"));
        let patch = SnapshotPatch::heartbeat(1_730_000_000, "hello");

        patch.apply_to(&mut snapshot);

        assert_eq!(snapshot["mood"], json!("calm"));
        assert_eq!(snapshot[HEARTBEAT_TS_KEY], json!(1_730_000_000));
        assert_eq!(snapshot[HEARTBEAT_TEXT_KEY], json!("hello"));
        assert_eq!(patch.len(), 2);
    }
}
