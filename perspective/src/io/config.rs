//! Engine configuration stored in `perspective.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::repair::NodeDefaults;

/// Default config file name, resolved against the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "perspective.toml";

/// Engine configuration (TOML).
///
/// Every vocabulary the triggers rely on lives here so it is injected at
/// construction. Missing fields default to the values the prompts were
/// written against.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PerspectiveConfig {
    /// Directory that receives one `<tree_id>.json` per generated tree.
    pub tree_dir: PathBuf,
    pub model: ModelConfig,
    pub generate: GenerateConfig,
    pub movement: MovementConfig,
    pub state_update: StateUpdateConfig,
    pub vocabulary: VocabularyConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ModelConfig {
    /// Program (plus arguments) that answers one model request on stdin/stdout.
    pub command: Vec<String>,
    /// Wall-clock limit for a single model call.
    pub timeout_secs: u64,
    /// Captured stdout/stderr beyond this many bytes is discarded.
    pub output_limit_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerateConfig {
    pub temperature: f32,
    /// Trailing history turns sent with the generation request.
    pub history_turns: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MovementConfig {
    pub temperature: f32,
    /// Trailing history turns sent with the move request.
    pub history_turns: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StateUpdateConfig {
    pub temperature: f32,
    /// Snapshot keys the model may write (heartbeat fields are always allowed).
    pub allowed_keys: Vec<String>,
    pub max_value_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct VocabularyConfig {
    /// Controlled `core_need` tags offered to the generation prompt.
    pub core_needs: Vec<String>,
    pub default_core_need: Vec<String>,
    pub default_potential_need: Vec<String>,
    /// Placeholder for missing titles, insights and viewpoints.
    pub placeholder: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SessionConfig {
    /// Turns kept in a session's history.
    pub history_limit: usize,
}

impl Default for PerspectiveConfig {
    fn default() -> Self {
        Self {
            tree_dir: PathBuf::from("data").join("perspective_trees"),
            model: ModelConfig::default(),
            generate: GenerateConfig::default(),
            movement: MovementConfig::default(),
            state_update: StateUpdateConfig::default(),
            vocabulary: VocabularyConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            command: vec!["llm-bridge".to_string()],
            timeout_secs: 120,
            output_limit_bytes: 200_000,
        }
    }
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            temperature: 0.55,
            history_turns: 10,
        }
    }
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            temperature: 0.25,
            history_turns: 8,
        }
    }
}

impl Default for StateUpdateConfig {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            allowed_keys: strings(&[
                "emotion",
                "need",
                "energy",
                "activity",
                "concern",
                "body_state",
                "social_state",
                "topic",
                "mood",
                "risk",
                "sleep",
                "focus",
            ]),
            max_value_chars: 20,
        }
    }
}

impl Default for VocabularyConfig {
    fn default() -> Self {
        let nodes = NodeDefaults::default();
        Self {
            core_needs: strings(&[
                "理解机制",
                "价值判断",
                "风险评估",
                "经验映射",
                "现实选择",
                "情绪安放",
                "自我定位",
                "行动准备",
            ]),
            default_core_need: nodes.core_need,
            default_potential_need: nodes.potential_need,
            placeholder: nodes.placeholder,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { history_limit: 40 }
    }
}

impl PerspectiveConfig {
    pub fn validate(&self) -> Result<()> {
        if self.tree_dir.as_os_str().is_empty() {
            return Err(anyhow!("tree_dir must not be empty"));
        }
        if self.model.command.is_empty() || self.model.command[0].trim().is_empty() {
            return Err(anyhow!("model.command must be a non-empty array"));
        }
        if self.model.timeout_secs == 0 {
            return Err(anyhow!("model.timeout_secs must be > 0"));
        }
        if self.model.output_limit_bytes == 0 {
            return Err(anyhow!("model.output_limit_bytes must be > 0"));
        }
        for (name, temperature) in [
            ("generate.temperature", self.generate.temperature),
            ("movement.temperature", self.movement.temperature),
            ("state_update.temperature", self.state_update.temperature),
        ] {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(anyhow!("{name} must be within [0, 2], got {temperature}"));
            }
        }
        if self.state_update.max_value_chars == 0 {
            return Err(anyhow!("state_update.max_value_chars must be > 0"));
        }
        if self.state_update.allowed_keys.is_empty() {
            return Err(anyhow!("state_update.allowed_keys must not be empty"));
        }
        if self.vocabulary.core_needs.is_empty() {
            return Err(anyhow!("vocabulary.core_needs must not be empty"));
        }
        if self.vocabulary.default_core_need.is_empty()
            || self.vocabulary.default_potential_need.is_empty()
        {
            return Err(anyhow!("vocabulary default needs must not be empty"));
        }
        if self.session.history_limit == 0 {
            return Err(anyhow!("session.history_limit must be > 0"));
        }
        Ok(())
    }

    pub fn node_defaults(&self) -> NodeDefaults {
        NodeDefaults {
            placeholder: self.vocabulary.placeholder.clone(),
            core_need: self.vocabulary.default_core_need.clone(),
            potential_need: self.vocabulary.default_potential_need.clone(),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `PerspectiveConfig::default()`.
pub fn load_config(path: &Path) -> Result<PerspectiveConfig> {
    if !path.exists() {
        let cfg = PerspectiveConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: PerspectiveConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &PerspectiveConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    super::write_atomic(path, &buf)
}
