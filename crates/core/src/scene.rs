//! The scene-block contract shared with the remote model.
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Sad,
    Happy,
    #[default]
    Neutral,
    Excited,
}

/// A single narrative unit of a scene. The JSON `type` field selects the variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Narration {
        text: String,
    },
    Dialogue {
        speaker: String,
        text: String,
        /// Image-regeneration directive for the speaker, null when unchanged.
        #[serde(default)]
        state: Option<String>,
        #[serde(default)]
        mood: Mood,
    },
    CharacterPrompt {
        character: String,
        question: String,
    },
    StoryPrompt {
        character: String,
        question: String,
        choices: Vec<String>,
    },
    /// Requested by the [`ReplySchema::BlockArray`] rules. Accepted under
    /// either schema and returned as-is.
    Background {
        description: String,
    },
}

impl Block {
    pub fn tag(&self) -> &'static str {
        match self {
            Block::Narration { .. } => "narration",
            Block::Dialogue { .. } => "dialogue",
            Block::CharacterPrompt { .. } => "character_prompt",
            Block::StoryPrompt { .. } => "story_prompt",
            Block::Background { .. } => "background",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    pub scene_id: u64,
    pub description: String,
    pub blocks: Vec<Block>,
}

/// A validated assistant reply, serialized back in the shape it arrived in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SceneReply {
    Document(SceneDocument),
    Blocks(Vec<Block>),
}

impl SceneReply {
    pub fn blocks(&self) -> &[Block] {
        match self {
            SceneReply::Document(document) => &document.blocks,
            SceneReply::Blocks(blocks) => blocks,
        }
    }

    pub fn scene_id(&self) -> Option<u64> {
        match self {
            SceneReply::Document(document) => Some(document.scene_id),
            SceneReply::Blocks(_) => None,
        }
    }
}

/// Which reply shape the assistant is instructed to produce and is held to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReplySchema {
    /// `{ "scene_id", "description", "blocks" }`
    #[default]
    SceneObject,
    /// A bare array of blocks, scene backgrounds carried as `background` blocks.
    BlockArray,
}

impl FromStr for ReplySchema {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "scene" | "object" => Ok(ReplySchema::SceneObject),
            "legacy" | "array" => Ok(ReplySchema::BlockArray),
            other => Err(format!("unknown reply schema '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: String,
}

/// What the player supplies when starting a game.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSetup {
    #[serde(rename = "name", default)]
    pub player_name: Option<String>,
    #[serde(rename = "prompt", default)]
    pub story_prompt: Option<String>,
    #[serde(default)]
    pub characters: Vec<Character>,
}
