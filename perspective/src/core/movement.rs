//! Consistency rules turning a raw move reply into a valid [`MoveDecision`].

use serde_json::{Map, Value};
use tracing::debug;

use crate::core::truthy::is_truthy;
use crate::core::types::MoveDecision;

/// Reason used when the model asks for a new tree without saying why.
pub const DEFAULT_NEW_TREE_REASON: &str = "这棵树不太贴合现在的话题，换一棵更合适的。";

/// Reconcile a parsed reply against the current node's `children`.
///
/// Priority, highest first:
/// 1. `need_new_tree` truthy: new tree, never a move.
/// 2. No children: stay.
/// 3. `move` truthy: advance only if `next_node_id` is one of `children`.
/// 4. Otherwise stay.
///
/// A missing reply behaves like one with every flag absent.
pub fn reconcile_move(reply: Option<&Map<String, Value>>, children: &[String]) -> MoveDecision {
    let flag = |key: &str| reply.and_then(|r| r.get(key)).is_some_and(is_truthy);
    let reason = reply
        .and_then(|r| r.get("reason"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    if flag("need_new_tree") {
        let reason = if reason.trim().is_empty() {
            DEFAULT_NEW_TREE_REASON.to_string()
        } else {
            reason
        };
        return MoveDecision::new_tree(reason);
    }

    if children.is_empty() {
        return MoveDecision::stay(reason);
    }

    if flag("move") {
        let next = reply
            .and_then(|r| r.get("next_node_id"))
            .and_then(Value::as_str);
        return match next {
            Some(next) if children.iter().any(|child| child == next) => {
                MoveDecision::advance(next, reason)
            }
            _ => {
                debug!(next = ?next, ?children, "move target is not a child, staying");
                MoveDecision::stay(reason)
            }
        };
    }

    MoveDecision::stay(reason)
}
