use crate::generic_types::{CompletionRequest, ImageRequest, ReplyMessage, RunState, Session, SpeechRequest};
use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

/// Encoded audio as it arrives from the speech provider.
pub type AudioStream = BoxStream<'static, Result<Bytes>>;

/// The hosted model as seen by the story components.
///
/// Every method is a single remote call. Implementations report failures with
/// the provider's own message and never retry.
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait StoryProvider: Send + Sync {
    /// Creates a persistent assistant and returns its id.
    async fn create_assistant(&self, model: &str, instructions: &str) -> Result<String>;

    async fn delete_assistant(&self, assistant_id: &str) -> Result<()>;

    /// Creates an empty conversation thread and returns its id.
    async fn create_thread(&self) -> Result<String>;

    async fn delete_thread(&self, thread_id: &str) -> Result<()>;

    async fn append_user_message(&self, thread_id: &str, text: &str) -> Result<()>;

    /// Starts a generation job on the session's thread. `additional_instructions`
    /// apply to this run only and are not stored in the thread.
    async fn start_run(&self, session: &Session, additional_instructions: Option<String>) -> Result<String>;

    async fn run_state(&self, thread_id: &str, run_id: &str) -> Result<RunState>;

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<()>;

    /// Most recent messages of the thread, newest first.
    async fn recent_messages(&self, thread_id: &str) -> Result<Vec<ReplyMessage>>;

    /// One-shot chat completion, returning the text of the first choice.
    async fn complete(&self, request: CompletionRequest) -> Result<String>;

    /// Generates an image and returns its URL, if the provider gave one.
    async fn generate_image(&self, request: ImageRequest) -> Result<Option<String>>;

    async fn download(&self, url: &str) -> Result<Bytes>;
}

#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    /// Fails before the stream is returned when the endpoint rejects the request.
    async fn synthesize(&self, request: SpeechRequest) -> Result<AudioStream>;
}
