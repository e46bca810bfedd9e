use crate::generic_types::RunState;
use std::time::Duration;

/// Every way a story operation can fail.
///
/// Provider failures arrive as `anyhow::Error` from the [`crate::provider`]
/// traits and are kept as `RemoteCallFailed` with the provider's message.
#[derive(Debug, thiserror::Error)]
pub enum StoryError {
    #[error("{0:#}")]
    RemoteCallFailed(#[from] anyhow::Error),
    #[error("Run status: {0}")]
    GenerationFailed(RunState),
    #[error("run did not finish within {0:?}")]
    Timeout(Duration),
    #[error("No assistant message returned.")]
    NoAssistantReply,
    #[error("Invalid JSON format from assistant: {reason}")]
    MalformedReply { reason: String, raw: String },
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("scene {0} not found")]
    SceneNotFound(u64),
    #[error("scene storage failed: {0}")]
    Storage(#[from] std::io::Error),
}

pub type Result<T, E = StoryError> = std::result::Result<T, E>;

impl StoryError {
    pub(crate) fn malformed(reason: impl Into<String>, raw: &str) -> Self {
        StoryError::MalformedReply {
            reason: reason.into(),
            raw: raw.to_string(),
        }
    }
}
