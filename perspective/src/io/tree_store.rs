//! Tree persistence: one pretty-printed JSON file per generated tree.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::core::types::Tree;

/// File name for `tree_id`; characters outside `[A-Za-z0-9_-]` become `_`.
pub fn tree_file_name(tree_id: &str) -> String {
    let stem: String = tree_id
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' {
                ch
            } else {
                '_'
            }
        })
        .collect();
    let stem = if stem.is_empty() { "tree".to_string() } else { stem };
    format!("{stem}.json")
}

/// Write `tree` to `<dir>/<tree_id>.json`.
///
/// Failures are logged and reported as `None`; persistence never aborts a turn.
pub fn save_tree(dir: &Path, tree: &Tree) -> Option<PathBuf> {
    let path = dir.join(tree_file_name(&tree.tree_id));
    match write_tree(&path, tree) {
        Ok(()) => {
            info!(tree_id = %tree.tree_id, path = %path.display(), "saved perspective tree");
            Some(path)
        }
        Err(err) => {
            warn!(tree_id = %tree.tree_id, error = %format!("{err:#}"), "failed to save perspective tree");
            None
        }
    }
}

fn write_tree(path: &Path, tree: &Tree) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create tree directory {}", parent.display()))?;
    }
    let mut buf = serde_json::to_string_pretty(tree).context("serialize tree")?;
    buf.push('\n');
    fs::write(path, buf).with_context(|| format!("write tree {}", path.display()))
}

/// Load a persisted tree. The file must already match the typed shape.
pub fn load_tree(path: &Path) -> Result<Tree> {
    debug!(path = %path.display(), "loading tree");
    let contents =
        fs::read_to_string(path).with_context(|| format!("read tree {}", path.display()))?;
    let tree: Tree = serde_json::from_str(&contents)
        .with_context(|| format!("parse tree {}", path.display()))?;
    Ok(tree)
}
