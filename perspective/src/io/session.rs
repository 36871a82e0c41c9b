//! Conversation session storage used by `perspective turn`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::core::types::{Snapshot, Tree};

/// Everything a turn needs from the previous one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Session {
    /// Active perspective tree, if one has been generated.
    pub tree: Option<Tree>,
    /// Accumulated user-state snapshot.
    pub snapshot: Snapshot,
    /// Talk history, oldest first. Entries are opaque to the engine.
    pub history: Vec<Value>,
}

impl Session {
    /// Append a turn and drop the oldest entries beyond `limit`.
    pub fn push_history(&mut self, entry: Value, limit: usize) {
        self.history.push(entry);
        if self.history.len() > limit {
            let excess = self.history.len() - limit;
            self.history.drain(..excess);
        }
    }
}

/// Load a session. A missing file is an empty session.
pub fn load_session(path: &Path) -> Result<Session> {
    if !path.exists() {
        debug!(path = %path.display(), "no session file, starting empty");
        return Ok(Session::default());
    }
    let contents =
        fs::read_to_string(path).with_context(|| format!("read session {}", path.display()))?;
    let session: Session = serde_json::from_str(&contents)
        .with_context(|| format!("parse session {}", path.display()))?;
    debug!(
        path = %path.display(),
        has_tree = session.tree.is_some(),
        history = session.history.len(),
        "session loaded"
    );
    Ok(session)
}

/// Atomically write a session (temp file + rename).
pub fn write_session(path: &Path, session: &Session) -> Result<()> {
    debug!(path = %path.display(), history = session.history.len(), "writing session");
    let mut buf = serde_json::to_string_pretty(session).context("serialize session")?;
    buf.push('\n');
    super::write_atomic(path, &buf)
}
