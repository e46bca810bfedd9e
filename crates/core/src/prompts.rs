use crate::scene::ReplySchema;
use std::collections::HashMap;

pub const PERSONA_DESIGNER: &str = "persona_designer";
pub const SCENE_RULES: &str = "scene_rules";
pub const LEGACY_BLOCK_RULES: &str = "legacy_block_rules";
pub const SPECULATIVE_TURN: &str = "speculative_turn";
pub const BRANCH_CHOICES: &str = "branch_choices";

/// Prompt texts sent to the model. Built-in texts can be overridden per key.
#[derive(Debug, Clone)]
pub struct Prompts {
    persona_designer: String,
    scene_rules: String,
    legacy_block_rules: String,
    speculative_turn: String,
    branch_choices: String,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            persona_designer: include_str!("../prompts/persona_designer.md").trim().to_string(),
            scene_rules: include_str!("../prompts/scene_rules.md").trim().to_string(),
            legacy_block_rules: include_str!("../prompts/legacy_block_rules.md").trim().to_string(),
            speculative_turn: include_str!("../prompts/speculative_turn.md").trim().to_string(),
            branch_choices: include_str!("../prompts/branch_choices.md").trim().to_string(),
        }
    }
}

impl Prompts {
    /// Replaces the built-in texts whose key appears in `overrides`.
    /// Unknown keys are logged and ignored.
    pub fn with_overrides(mut self, overrides: &HashMap<String, String>) -> Self {
        for (key, text) in overrides {
            let slot = match key.as_str() {
                PERSONA_DESIGNER => &mut self.persona_designer,
                SCENE_RULES => &mut self.scene_rules,
                LEGACY_BLOCK_RULES => &mut self.legacy_block_rules,
                SPECULATIVE_TURN => &mut self.speculative_turn,
                BRANCH_CHOICES => &mut self.branch_choices,
                other => {
                    tracing::warn!("ignoring unknown prompt override '{}'", other);
                    continue;
                }
            };
            *slot = text.trim().to_string();
        }
        self
    }

    pub fn persona_designer(&self) -> &str {
        &self.persona_designer
    }

    /// The reply contract appended to every assistant's instructions.
    pub fn block_rules(&self, schema: ReplySchema) -> &str {
        match schema {
            ReplySchema::SceneObject => &self.scene_rules,
            ReplySchema::BlockArray => &self.legacy_block_rules,
        }
    }

    pub fn speculative_turn(&self) -> &str {
        &self.speculative_turn
    }

    pub fn branch_choices(&self) -> &str {
        &self.branch_choices
    }
}
