//! Test-only helpers: a scripted model backend and tree builders.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::path::Path;

use anyhow::{Result, anyhow};
use serde_json::Value;

use crate::core::types::{Node, Stance, Tree};
use crate::io::config::PerspectiveConfig;
use crate::io::model::ModelClient;

/// One call observed by [`ScriptedModel`].
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub role: String,
    pub payload: Value,
    pub temperature: f32,
}

/// Model backend that replays queued replies in order and records every call.
///
/// Calls past the end of the queue fail, which exercises the fallback paths.
#[derive(Default)]
pub struct ScriptedModel {
    replies: RefCell<VecDeque<Result<String>>>,
    requests: RefCell<Vec<ModelRequest>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let model = Self::new();
        for reply in replies {
            model.push_reply(reply);
        }
        model
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        self.replies.borrow_mut().push_back(Ok(reply.into()));
    }

    pub fn push_err(&self, err: anyhow::Error) {
        self.replies.borrow_mut().push_back(Err(err));
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.borrow().clone()
    }

    /// Requests made with `role`, oldest first.
    pub fn requests_for(&self, role: &str) -> Vec<ModelRequest> {
        self.requests
            .borrow()
            .iter()
            .filter(|request| request.role == role)
            .cloned()
            .collect()
    }
}

impl ModelClient for ScriptedModel {
    fn call(&self, role: &str, payload: &Value, temperature: f32) -> Result<String> {
        self.requests.borrow_mut().push(ModelRequest {
            role: role.to_string(),
            payload: payload.clone(),
            temperature,
        });
        self.replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(anyhow!("scripted model has no reply for {role}")))
    }
}

/// Viewpoint node with deterministic text and the given children.
pub fn viewpoint_node(id: &str, children: &[&str]) -> Node {
    Node {
        id: id.to_string(),
        title: format!("{id} title"),
        stance: Stance::Viewpoint {
            user_viewpoint: format!("{id} viewpoint"),
            our_viewpoint: format!("{id} response"),
            potential_need: vec![format!("{id} need")],
        },
        children: children.iter().map(|child| child.to_string()).collect(),
        is_end: false,
    }
}

/// Tree keyed by node id, positioned at `root`.
pub fn tree_of(root: &str, nodes: Vec<Node>) -> Tree {
    Tree {
        tree_id: "tree_test".to_string(),
        root_id: root.to_string(),
        current_node_id: root.to_string(),
        generated_at: "2026-10-18_09-30-00".to_string(),
        nodes: nodes
            .into_iter()
            .map(|node| (node.id.clone(), node))
            .collect::<BTreeMap<_, _>>(),
    }
}

/// Default configuration writing trees under `tree_dir`.
pub fn test_config(tree_dir: &Path) -> PerspectiveConfig {
    PerspectiveConfig {
        tree_dir: tree_dir.to_path_buf(),
        ..PerspectiveConfig::default()
    }
}
