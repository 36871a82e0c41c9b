//! Instruction prompts for the three model roles.
//!
//! Templates are embedded at compile time and rendered once per trigger with
//! the configured vocabularies, so the prompt always names the same tags and
//! keys the repair and cleaning rules enforce.

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use tracing::debug;

use crate::core::types::{HEARTBEAT_TEXT_KEY, HEARTBEAT_TS_KEY};
use crate::io::config::PerspectiveConfig;

const GENERATE_TEMPLATE: &str = include_str!("prompts/generate.md");
const MOVEMENT_TEMPLATE: &str = include_str!("prompts/movement.md");
const STATE_UPDATE_TEMPLATE: &str = include_str!("prompts/state_update.md");

/// Template engine wrapper around minijinja.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.add_template("generate", GENERATE_TEMPLATE)
            .context("load generate template")?;
        env.add_template("movement", MOVEMENT_TEMPLATE)
            .context("load movement template")?;
        env.add_template("state_update", STATE_UPDATE_TEMPLATE)
            .context("load state_update template")?;
        Ok(Self { env })
    }

    /// Two-phase tree generation prompt listing the core-need vocabulary.
    pub fn render_generate(&self, config: &PerspectiveConfig) -> Result<String> {
        let rendered = self
            .env
            .get_template("generate")?
            .render(context! {
                core_needs => &config.vocabulary.core_needs,
            })
            .context("render generate prompt")?;
        debug!(bytes = rendered.len(), "rendered generate prompt");
        Ok(rendered)
    }

    /// Move / stay / need-new-tree classification prompt.
    pub fn render_movement(&self) -> Result<String> {
        let rendered = self
            .env
            .get_template("movement")?
            .render(context! {})
            .context("render movement prompt")?;
        debug!(bytes = rendered.len(), "rendered movement prompt");
        Ok(rendered)
    }

    /// Snapshot update prompt listing the allow-listed keys.
    pub fn render_state_update(&self, config: &PerspectiveConfig) -> Result<String> {
        let rendered = self
            .env
            .get_template("state_update")?
            .render(context! {
                allowed_keys => &config.state_update.allowed_keys,
                max_value_chars => config.state_update.max_value_chars,
                ts_key => HEARTBEAT_TS_KEY,
                text_key => HEARTBEAT_TEXT_KEY,
            })
            .context("render state_update prompt")?;
        debug!(bytes = rendered.len(), "rendered state_update prompt");
        Ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_prompt_lists_every_core_need_tag() {
        let config = PerspectiveConfig::default();
        let prompt = PromptEngine::new()
            .expect("engine")
            .render_generate(&config)
            .expect("render");

        for tag in &config.vocabulary.core_needs {
            assert!(prompt.contains(&format!("- {tag}")), "missing tag {tag}");
        }
        assert!(prompt.contains("<contract>"));
        assert!(prompt.contains("\"root_id\": \"N0\""));
    }

    #[test]
    fn generate_prompt_follows_configured_vocabulary() {
        let mut config = PerspectiveConfig::default();
        config.vocabulary.core_needs = vec!["边界感".to_string()];
        let prompt = PromptEngine::new()
            .expect("engine")
            .render_generate(&config)
            .expect("render");
        assert!(prompt.contains("- 边界感"));
        assert!(!prompt.contains("- 理解机制"));
    }

    #[test]
    fn movement_prompt_states_the_three_choices() {
        let prompt = PromptEngine::new()
            .expect("engine")
            .render_movement()
            .expect("render");
        assert!(prompt.contains("need_new_tree"));
        assert!(prompt.contains("\"move\": \"move | stay | none\""));
        assert!(prompt.contains("\"need_new_tree\": true | false,"));
        assert!(!prompt.contains("\"need_new_tree\": true,"));
    }

    #[test]
    fn state_update_prompt_names_keys_and_heartbeat() {
        let config = PerspectiveConfig::default();
        let prompt = PromptEngine::new()
            .expect("engine")
            .render_state_update(&config)
            .expect("render");
        assert!(prompt.contains("emotion, need, energy"));
        assert!(prompt.contains(HEARTBEAT_TS_KEY));
        assert!(prompt.contains(HEARTBEAT_TEXT_KEY));
        assert!(prompt.contains("{\"emotion\":\"烦\""));
        assert!(prompt.contains("不超过 20 个字"));
    }
}
