//! Repair pass that turns any candidate value into a structurally valid tree.
//!
//! The pass never fails. Missing fields get defaults, dangling child
//! references are dropped, the root gets an outgoing edge and at least one
//! node is terminal. Inputs that cannot be repaired are replaced by
//! [`fallback_tree`].
//!
//! Wherever a rule picks "some" node (the root replacement, the root's child,
//! the terminal node), the candidate's own key order decides.

use std::collections::HashSet;

use serde_json::{Map, Value};
use tracing::debug;

use crate::core::fallback::{DEFAULT_ROOT_ID, fallback_tree};
use crate::core::truthy::is_truthy;
use crate::core::types::{Node, Stance, Tree};

const INSIGHT_KEYS: [&str; 2] = ["philosophical_insight", "core_need"];
const VIEWPOINT_KEYS: [&str; 3] = ["user_viewpoint", "our_viewpoint", "potential_need"];

/// Default-fill values for nodes with missing fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeDefaults {
    /// Used for missing titles, insights and viewpoints.
    pub placeholder: String,
    /// Fill for insight nodes without a usable `core_need`.
    pub core_need: Vec<String>,
    /// Fill for viewpoint nodes without a usable `potential_need`.
    pub potential_need: Vec<String>,
}

impl Default for NodeDefaults {
    fn default() -> Self {
        Self {
            placeholder: "（待定）".to_string(),
            core_need: vec!["理解机制".to_string(), "自我定位".to_string()],
            potential_need: vec!["陪你理一理".to_string(), "确认你真正想要的".to_string()],
        }
    }
}

/// Identifiers used when the candidate lacks its own.
#[derive(Debug, Clone, Copy)]
pub struct FallbackIds<'a> {
    pub tree_id: &'a str,
    pub generated_at: &'a str,
}

/// Repair `candidate` into a tree satisfying every structural invariant.
pub fn repair_tree(
    candidate: Option<Value>,
    fallback: FallbackIds<'_>,
    defaults: &NodeDefaults,
) -> Tree {
    let Some(Value::Object(mut raw)) = candidate else {
        debug!("candidate tree is not an object, using fallback tree");
        return fallback_tree(fallback.tree_id, fallback.generated_at);
    };

    let tree_id = text_field(&raw, "tree_id").unwrap_or_else(|| fallback.tree_id.to_string());
    let generated_at =
        text_field(&raw, "generated_at").unwrap_or_else(|| fallback.generated_at.to_string());
    let mut root_id = text_field(&raw, "root_id").unwrap_or_else(|| DEFAULT_ROOT_ID.to_string());
    let mut current_node_id = text_field(&raw, "current_node_id").unwrap_or_else(|| root_id.clone());

    let raw_nodes = match raw.remove("nodes") {
        Some(Value::Object(nodes)) if !nodes.is_empty() => nodes,
        _ => {
            debug!(%tree_id, "candidate tree has no nodes, using fallback tree");
            return fallback_tree(&tree_id, &generated_at);
        }
    };

    let order: Vec<String> = raw_nodes.keys().cloned().collect();
    let known: HashSet<&str> = order.iter().map(String::as_str).collect();

    if !known.contains(root_id.as_str()) {
        let replacement = if known.contains(DEFAULT_ROOT_ID) {
            DEFAULT_ROOT_ID.to_string()
        } else {
            order[0].clone()
        };
        debug!(from = %root_id, to = %replacement, "reassigned root_id");
        root_id = replacement;
    }
    if !known.contains(current_node_id.as_str()) {
        debug!(from = %current_node_id, to = %root_id, "reassigned current_node_id");
        current_node_id = root_id.clone();
    }

    let mut nodes: Vec<Node> = raw_nodes
        .into_iter()
        .map(|(id, value)| repair_node(id, value, defaults))
        .collect();

    for node in &mut nodes {
        let before = node.children.len();
        node.children.retain(|child| known.contains(child.as_str()));
        let dropped = before - node.children.len();
        if dropped > 0 {
            debug!(node = %node.id, dropped, "dropped dangling children");
        }
    }

    ensure_root_edge(&mut nodes, &root_id);
    ensure_terminal(&mut nodes);

    Tree {
        tree_id,
        root_id,
        current_node_id,
        generated_at,
        nodes: nodes.into_iter().map(|node| (node.id.clone(), node)).collect(),
    }
}

/// Coerce one raw node into a [`Node`]; the map key is authoritative for `id`.
fn repair_node(id: String, value: Value, defaults: &NodeDefaults) -> Node {
    let raw = match value {
        Value::Object(fields) => fields,
        other => {
            debug!(node = %id, kind = value_kind(&other), "node is not an object, rebuilding");
            Map::new()
        }
    };

    let title = text_field(&raw, "title").unwrap_or_else(|| defaults.placeholder.clone());
    let children = match raw.get("children") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };
    let is_end = raw.get("is_end").is_some_and(is_truthy);

    let stance = if is_insight(&raw) {
        Stance::Insight {
            philosophical_insight: text_field(&raw, "philosophical_insight")
                .unwrap_or_else(|| defaults.placeholder.clone()),
            core_need: need_list(raw.get("core_need"))
                .unwrap_or_else(|| defaults.core_need.clone()),
        }
    } else {
        Stance::Viewpoint {
            user_viewpoint: text_field(&raw, "user_viewpoint")
                .unwrap_or_else(|| defaults.placeholder.clone()),
            our_viewpoint: text_field(&raw, "our_viewpoint")
                .unwrap_or_else(|| defaults.placeholder.clone()),
            potential_need: need_list(raw.get("potential_need"))
                .unwrap_or_else(|| defaults.potential_need.clone()),
        }
    };

    Node {
        id,
        title,
        stance,
        children,
        is_end,
    }
}

/// Insight when the node carries usable insight content, or only insight keys.
///
/// A null or empty `core_need` next to viewpoint fields leaves the node a
/// viewpoint, so the model's viewpoint text survives.
fn is_insight(raw: &Map<String, Value>) -> bool {
    let has_insight_content = text_field(raw, "philosophical_insight").is_some()
        || need_list(raw.get("core_need")).is_some();
    if has_insight_content {
        return true;
    }
    let has_insight_key = INSIGHT_KEYS.iter().any(|key| raw.contains_key(*key));
    let has_viewpoint_key = VIEWPOINT_KEYS.iter().any(|key| raw.contains_key(*key));
    has_insight_key && !has_viewpoint_key
}

/// With more than one node, a childless root gets the first other node as child.
fn ensure_root_edge(nodes: &mut [Node], root_id: &str) {
    if nodes.len() < 2 {
        return;
    }
    let Some(alt) = nodes
        .iter()
        .find(|node| node.id != root_id)
        .map(|node| node.id.clone())
    else {
        return;
    };
    if let Some(root) = nodes.iter_mut().find(|node| node.id == root_id)
        && root.children.is_empty()
    {
        debug!(root = %root_id, child = %alt, "gave childless root an edge");
        root.children = vec![alt];
    }
}

/// Mark a terminal node when none is flagged: first childless, else the last.
fn ensure_terminal(nodes: &mut [Node]) {
    if nodes.iter().any(|node| node.is_end) {
        return;
    }
    let leaf = nodes.iter().position(|node| node.children.is_empty());
    let idx = leaf.unwrap_or(nodes.len() - 1);
    if let Some(node) = nodes.get_mut(idx) {
        debug!(node = %node.id, childless = leaf.is_some(), "marked terminal node");
        node.is_end = true;
    }
}

/// Non-blank text for `key`; other scalars are stringified.
fn text_field(raw: &Map<String, Value>, key: &str) -> Option<String> {
    match raw.get(key)? {
        Value::Null => None,
        Value::String(text) if text.trim().is_empty() => None,
        Value::String(text) => Some(text.clone()),
        other @ (Value::Bool(_) | Value::Number(_)) => Some(other.to_string()),
        _ => None,
    }
}

/// Non-empty list of non-blank strings, or `None` if the field is unusable.
fn need_list(value: Option<&Value>) -> Option<Vec<String>> {
    let Value::Array(items) = value? else {
        return None;
    };
    let needs: Vec<String> = items
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|need| !need.is_empty())
        .map(str::to_string)
        .collect();
    (!needs.is_empty()).then_some(needs)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
