//! Repair and validation of assistant replies.
//!
//! The model is told the block contract in its instructions, but nothing makes
//! it comply. A reply is therefore cleaned up, deserialized into the typed
//! [`SceneReply`] for the configured [`ReplySchema`], and checked. Anything that
//! does not survive becomes [`StoryError::MalformedReply`] carrying the raw text.
use crate::error::{Result, StoryError};
use crate::scene::{Block, ReplySchema, SceneDocument, SceneReply};
use serde_json::Value;

pub const MIN_CHOICES: usize = 2;
pub const MAX_CHOICES: usize = 5;

pub fn parse_reply(raw: &str, schema: ReplySchema) -> Result<SceneReply> {
    let cleaned = strip_code_fence(raw);
    let value: Value =
        serde_json::from_str(cleaned).map_err(|e| StoryError::malformed(e.to_string(), raw))?;

    let reply = match schema {
        ReplySchema::SceneObject if value.is_object() => SceneReply::Document(
            serde_json::from_value::<SceneDocument>(value)
                .map_err(|e| StoryError::malformed(e.to_string(), raw))?,
        ),
        ReplySchema::BlockArray if value.is_array() => SceneReply::Blocks(
            serde_json::from_value::<Vec<Block>>(value)
                .map_err(|e| StoryError::malformed(e.to_string(), raw))?,
        ),
        ReplySchema::SceneObject => {
            return Err(StoryError::malformed(
                "expected an object with scene_id, description and blocks",
                raw,
            ));
        }
        ReplySchema::BlockArray => {
            return Err(StoryError::malformed("expected an array of blocks", raw));
        }
    };

    validate(&reply).map_err(|reason| StoryError::malformed(reason, raw))?;
    Ok(reply)
}

/// Drops surrounding whitespace and a Markdown code fence, which models add
/// despite being told not to.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip the info string (`json`) on the opening fence line.
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

fn validate(reply: &SceneReply) -> std::result::Result<(), String> {
    let blocks = reply.blocks();
    if blocks.is_empty() {
        return Err("blocks must not be empty".to_string());
    }

    for (idx, block) in blocks.iter().enumerate() {
        match block {
            Block::Dialogue { speaker, .. } if speaker.trim().is_empty() => {
                return Err(format!("block {}: dialogue needs a speaker", idx));
            }
            Block::CharacterPrompt { character, .. } if character.trim().is_empty() => {
                return Err(format!("block {}: character_prompt needs a character", idx));
            }
            Block::StoryPrompt { character, .. } if character.trim().is_empty() => {
                return Err(format!("block {}: story_prompt needs a character", idx));
            }
            Block::StoryPrompt { choices, .. }
                if !(MIN_CHOICES..=MAX_CHOICES).contains(&choices.len()) =>
            {
                return Err(format!(
                    "block {}: story_prompt needs {} to {} choices, got {}",
                    idx,
                    MIN_CHOICES,
                    MAX_CHOICES,
                    choices.len()
                ));
            }
            _ => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Mood;

    const SCENE: &str = r#"{
        "scene_id": 3,
        "description": "A lantern-lit market under a bridge.",
        "blocks": [
            {"type": "narration", "text": "Rain drums on the canvas stalls."},
            {"type": "dialogue", "speaker": "Oren", "text": "You came back.", "state": null, "mood": "happy"},
            {"type": "story_prompt", "character": "Oren", "question": "What now?", "choices": ["Buy the map", "Walk away"]}
        ]
    }"#;

    fn reason_of(err: StoryError) -> (String, String) {
        match err {
            StoryError::MalformedReply { reason, raw } => (reason, raw),
            other => panic!("expected MalformedReply, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_scene_document() {
        let reply = parse_reply(SCENE, ReplySchema::SceneObject).unwrap();

        assert_eq!(reply.scene_id(), Some(3));
        let tags: Vec<_> = reply.blocks().iter().map(Block::tag).collect();
        assert_eq!(tags, vec!["narration", "dialogue", "story_prompt"]);
    }

    #[test]
    fn test_code_fence_is_stripped() {
        let fenced = format!("```json\n{}\n```\n", SCENE);
        let reply = parse_reply(&fenced, ReplySchema::SceneObject).unwrap();
        assert_eq!(reply.blocks().len(), 3);
    }

    #[test]
    fn test_non_json_keeps_raw_text() {
        let raw = "Once upon a time, the market closed.";
        let (_, kept) = reason_of(parse_reply(raw, ReplySchema::SceneObject).unwrap_err());
        assert_eq!(kept, raw);
    }

    #[test]
    fn test_shape_must_match_schema() {
        let array = r#"[{"type": "narration", "text": "hi"}]"#;
        let (reason, _) = reason_of(parse_reply(array, ReplySchema::SceneObject).unwrap_err());
        assert!(reason.contains("expected an object"));

        let (reason, _) = reason_of(parse_reply(SCENE, ReplySchema::BlockArray).unwrap_err());
        assert!(reason.contains("expected an array"));
    }

    #[test]
    fn test_legacy_array_with_background() {
        let raw = r#"[
            {"type": "background", "description": "A foggy pier."},
            {"type": "dialogue", "speaker": "Ilse", "text": "Quiet."}
        ]"#;
        let reply = parse_reply(raw, ReplySchema::BlockArray).unwrap();

        assert_eq!(reply.scene_id(), None);
        match &reply.blocks()[1] {
            Block::Dialogue { state, mood, .. } => {
                assert_eq!(*state, None);
                assert_eq!(*mood, Mood::Neutral, "missing mood defaults to neutral");
            }
            other => panic!("expected dialogue, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_block_type_is_rejected() {
        let raw = r#"{"scene_id": 1, "description": "d", "blocks": [{"type": "song", "lyrics": "la"}]}"#;
        let (reason, raw_kept) = reason_of(parse_reply(raw, ReplySchema::SceneObject).unwrap_err());
        assert!(reason.contains("song"), "reason was {}", reason);
        assert_eq!(raw_kept, raw);
    }

    #[test]
    fn test_invalid_mood_is_rejected() {
        let raw = r#"[{"type": "dialogue", "speaker": "A", "text": "b", "mood": "furious"}]"#;
        assert!(parse_reply(raw, ReplySchema::BlockArray).is_err());
    }

    #[test]
    fn test_empty_blocks_are_rejected() {
        let raw = r#"{"scene_id": 1, "description": "d", "blocks": []}"#;
        let (reason, _) = reason_of(parse_reply(raw, ReplySchema::SceneObject).unwrap_err());
        assert_eq!(reason, "blocks must not be empty");
    }

    #[test]
    fn test_choice_count_is_bounded() {
        let one = r#"[{"type": "story_prompt", "character": "A", "question": "?", "choices": ["only"]}]"#;
        let (reason, _) = reason_of(parse_reply(one, ReplySchema::BlockArray).unwrap_err());
        assert_eq!(reason, "block 0: story_prompt needs 2 to 5 choices, got 1");

        let six = r#"[{"type": "story_prompt", "character": "A", "question": "?", "choices": ["1","2","3","4","5","6"]}]"#;
        assert!(parse_reply(six, ReplySchema::BlockArray).is_err());

        let five = r#"[{"type": "story_prompt", "character": "A", "question": "?", "choices": ["1","2","3","4","5"]}]"#;
        assert!(parse_reply(five, ReplySchema::BlockArray).is_ok());
    }

    #[test]
    fn test_blank_speaker_is_rejected() {
        let raw = r#"[{"type": "dialogue", "speaker": " ", "text": "b", "mood": "sad"}]"#;
        let (reason, _) = reason_of(parse_reply(raw, ReplySchema::BlockArray).unwrap_err());
        assert_eq!(reason, "block 0: dialogue needs a speaker");
    }

    #[test]
    fn test_blank_story_prompt_character_is_rejected() {
        let raw = r#"[{"type": "story_prompt", "character": "  ", "question": "?", "choices": ["a", "b"]}]"#;
        let (reason, kept) = reason_of(parse_reply(raw, ReplySchema::BlockArray).unwrap_err());
        assert_eq!(reason, "block 0: story_prompt needs a character");
        assert_eq!(kept, raw);
    }
}
