//! Story orchestration for the visual-novel backend.
//!
//! The components in this crate talk to the hosted model only through the
//! [`provider::StoryProvider`] and [`provider::SpeechProvider`] traits, so the
//! HTTP service can plug in a real client and tests can plug in mocks.
pub mod archive;
pub mod background;
pub mod error;
pub mod generic_types;
pub mod prompts;
pub mod provider;
pub mod reply;
pub mod scene;
pub mod session;
pub mod speech;
pub mod turn;

pub use error::{Result, StoryError};
pub use generic_types::{ReplyMessage, Role, RunState, Session};
pub use scene::{Block, Character, GameSetup, Mood, ReplySchema, SceneDocument, SceneReply};
