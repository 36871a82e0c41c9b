//! Structural invariants every perspective tree must satisfy.

use crate::core::types::Tree;

/// Check structural invariants:
/// - `root_id` and `current_node_id` name existing nodes
/// - each node's `id` matches its key
/// - every child reference names an existing node
/// - a multi-node tree gives the root at least one child
/// - at least one node is terminal (`is_end` or childless)
pub fn validate_invariants(tree: &Tree) -> Vec<String> {
    let mut errors = Vec::new();

    if tree.nodes.is_empty() {
        errors.push("tree has no nodes".to_string());
        return errors;
    }

    if !tree.nodes.contains_key(&tree.root_id) {
        errors.push(format!("root_id '{}' is not a node", tree.root_id));
    }
    if !tree.nodes.contains_key(&tree.current_node_id) {
        errors.push(format!(
            "current_node_id '{}' is not a node",
            tree.current_node_id
        ));
    }

    for (key, node) in &tree.nodes {
        if node.id != *key {
            errors.push(format!("{}: id '{}' does not match its key", key, node.id));
        }
        for child in &node.children {
            if !tree.nodes.contains_key(child) {
                errors.push(format!("{}: child '{}' does not exist", key, child));
            }
        }
    }

    if tree.nodes.len() > 1
        && let Some(root) = tree.nodes.get(&tree.root_id)
        && root.children.is_empty()
    {
        errors.push(format!(
            "{}: root has no children in a {}-node tree",
            tree.root_id,
            tree.nodes.len()
        ));
    }

    if !tree.nodes.values().any(|node| node.is_terminal()) {
        errors.push("no terminal node (is_end or childless)".to_string());
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{tree_of, viewpoint_node};

    #[test]
    fn valid_tree_reports_nothing() {
        let tree = tree_of(
            "N0",
            vec![viewpoint_node("N0", &["N1"]), viewpoint_node("N1", &[])],
        );
        assert!(validate_invariants(&tree).is_empty());
    }

    #[test]
    fn reports_every_violation() {
        let mut tree = tree_of(
            "N0",
            vec![
                viewpoint_node("N0", &[]),
                viewpoint_node("N1", &["N9", "N2"]),
                viewpoint_node("N2", &["N1"]),
            ],
        );
        tree.current_node_id = "N5".to_string();
        if let Some(node) = tree.nodes.get_mut("N2") {
            node.id = "other".to_string();
        }

        let errors = validate_invariants(&tree);
        assert!(errors.iter().any(|err| err.contains("current_node_id 'N5'")));
        assert!(errors.iter().any(|err| err.contains("child 'N9'")));
        assert!(errors.iter().any(|err| err.contains("does not match its key")));
        assert!(errors.iter().any(|err| err.contains("root has no children")));
        // N0 is childless, so a terminal node still exists.
        assert!(!errors.iter().any(|err| err.contains("no terminal node")));
    }

    #[test]
    fn reports_missing_terminal_and_root() {
        let mut tree = tree_of(
            "N0",
            vec![viewpoint_node("N0", &["N1"]), viewpoint_node("N1", &["N0"])],
        );
        tree.root_id = "gone".to_string();

        let errors = validate_invariants(&tree);
        assert!(errors.iter().any(|err| err.contains("root_id 'gone'")));
        assert!(errors.iter().any(|err| err.contains("no terminal node")));
    }
}
