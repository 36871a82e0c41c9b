//! Fixed three-node tree used whenever a candidate tree is unusable.

use std::collections::BTreeMap;

use crate::core::types::{Node, Stance, Tree};

/// Root id assumed when a candidate omits `root_id`.
pub const DEFAULT_ROOT_ID: &str = "N0";

struct FallbackStep {
    id: &'static str,
    title: &'static str,
    user_viewpoint: &'static str,
    our_viewpoint: &'static str,
    potential_need: [&'static str; 2],
}

const STEPS: [FallbackStep; 3] = [
    FallbackStep {
        id: "N0",
        title: "先把主线捏出来",
        user_viewpoint: "你可能想聊点什么，但还没完全说清楚。",
        our_viewpoint: "我们先把‘你现在最想处理的那一件事’挑出来，再决定怎么聊。",
        potential_need: ["确定主线", "有人接住"],
    },
    FallbackStep {
        id: "N1",
        title: "拆一个最卡的点",
        user_viewpoint: "你开始说出困扰的细节，或者说出你真正的担心。",
        our_viewpoint: "我先帮你把最卡的那个点拆清楚：你在担心什么、你想要什么、你怕失去什么。",
        potential_need: ["缓解焦虑", "获得清晰感"],
    },
    FallbackStep {
        id: "N2",
        title: "给一个下一步",
        user_viewpoint: "你希望有个可执行的小动作，别只停在情绪里。",
        our_viewpoint: "我给你一个小到立刻能做的下一步：不求完美，只求开始动起来。",
        potential_need: ["行动建议", "被陪着执行"],
    },
];

/// Build the fallback chain N0 -> N1 -> N2; only N2 is terminal.
pub fn fallback_tree(tree_id: &str, generated_at: &str) -> Tree {
    let mut nodes = BTreeMap::new();
    for (idx, step) in STEPS.iter().enumerate() {
        let children = STEPS
            .get(idx + 1)
            .map(|next| vec![next.id.to_string()])
            .unwrap_or_default();
        nodes.insert(
            step.id.to_string(),
            Node {
                id: step.id.to_string(),
                title: step.title.to_string(),
                stance: Stance::Viewpoint {
                    user_viewpoint: step.user_viewpoint.to_string(),
                    our_viewpoint: step.our_viewpoint.to_string(),
                    potential_need: step.potential_need.iter().map(|s| s.to_string()).collect(),
                },
                is_end: children.is_empty(),
                children,
            },
        );
    }

    Tree {
        tree_id: tree_id.to_string(),
        root_id: DEFAULT_ROOT_ID.to_string(),
        current_node_id: DEFAULT_ROOT_ID.to_string(),
        generated_at: generated_at.to_string(),
        nodes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::invariants::validate_invariants;

    #[test]
    fn fallback_is_a_valid_three_step_chain() {
        let tree = fallback_tree("tree_x", "2026-10-18_09-30-00");

        assert!(validate_invariants(&tree).is_empty());
        assert_eq!(tree.nodes.len(), 3);
        assert_eq!(tree.nodes["N0"].children, vec!["N1".to_string()]);
        assert_eq!(tree.nodes["N1"].children, vec!["N2".to_string()]);
        assert!(tree.nodes["N2"].children.is_empty());

        let terminal: Vec<&str> = tree
            .nodes
            .values()
            .filter(|node| node.is_end)
            .map(|node| node.id.as_str())
            .collect();
        assert_eq!(terminal, vec!["N2"]);
    }
}
