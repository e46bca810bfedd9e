use crate::types;
use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::{Arc, Mutex};

mod config;
mod consts;
mod stats;
mod utils;

pub use config::{Config as ClientConfig, ConfigBuilder as ClientConfigBuilder};
pub use stats::Stats;

/// Audio bytes as they arrive from the speech endpoint.
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// The REST surface used by the storyteller. Implemented by [`Client`]; the
/// service adapter is generic over it so it can be exercised with a mock.
#[async_trait]
pub trait AssistantsClient: Send + Sync {
    async fn create_assistant(&self, request: types::CreateAssistantRequest) -> Result<types::Assistant>;

    async fn delete_assistant(&self, assistant_id: &str) -> Result<types::DeletionStatus>;

    async fn create_thread(&self) -> Result<types::Thread>;

    async fn delete_thread(&self, thread_id: &str) -> Result<types::DeletionStatus>;

    async fn create_message(
        &self,
        thread_id: &str,
        request: types::CreateMessageRequest,
    ) -> Result<types::ThreadMessage>;

    async fn create_run(&self, thread_id: &str, request: types::CreateRunRequest) -> Result<types::Run>;

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<types::Run>;

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<types::Run>;

    /// Lists messages of a thread, newest first.
    async fn list_messages(&self, thread_id: &str) -> Result<types::MessageList>;

    async fn create_chat_completion(
        &self,
        request: types::ChatCompletionRequest,
    ) -> Result<types::ChatCompletionResponse>;

    async fn generate_image(&self, request: types::ImageGenerationRequest) -> Result<types::ImagesResponse>;

    /// Starts a speech synthesis request. Fails before yielding anything if the
    /// endpoint answers with a non-success status.
    async fn create_speech(&self, request: types::SpeechRequest) -> Result<ByteStream>;

    /// Fetches a generated asset (for example an image URL) in full.
    async fn download(&self, url: &str) -> Result<Bytes>;
}

// Holds the HTTP connection pool, configuration, and usage stats guarded by a Mutex.
pub struct Client {
    http: reqwest::Client,
    config: config::Config,
    stats: Arc<Mutex<Stats>>,
}

impl Client {
    fn new(http: reqwest::Client, config: config::Config) -> Self {
        Self {
            http,
            config,
            stats: Arc::new(Mutex::new(Stats::new())),
        }
    }

    pub fn config(&self) -> &config::Config {
        &self.config
    }

    // Return a stats object that we can use to inspect the stats.
    pub fn stats(&self) -> Result<Stats> {
        if let Ok(stats_guard) = self.stats.lock() {
            Ok(stats_guard.clone())
        } else {
            Err(anyhow::anyhow!("failed to get stats"))
        }
    }

    fn record_usage(&self, usage: Option<&types::Usage>) {
        let Some(usage) = usage else {
            return;
        };
        if let Ok(mut stats_guard) = self.stats.lock() {
            stats_guard.update_usage(usage);
        } else {
            tracing::error!("failed to update stats");
        }
        tracing::debug!(
            "total_tokens: {}, prompt_tokens: {}, completion_tokens: {}",
            usage.total_tokens(),
            usage.prompt_tokens(),
            usage.completion_tokens()
        );
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.http.get(self.config.url(path)).send().await?;
        Self::decode(response, path).await
    }

    async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let response = self.http.post(self.config.url(path)).json(body).send().await?;
        Self::decode(response, path).await
    }

    async fn delete_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.http.delete(self.config.url(path)).send().await?;
        Self::decode(response, path).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response, path: &str) -> Result<T> {
        let response = utils::check_response(response).await?;
        response
            .json::<T>()
            .await
            .with_context(|| format!("failed to decode response from {}", path))
    }

    fn ensure_deleted(status: types::DeletionStatus) -> Result<types::DeletionStatus> {
        if status.deleted() {
            Ok(status)
        } else {
            Err(anyhow::anyhow!("{} was not deleted", status.id()))
        }
    }
}

#[async_trait]
impl AssistantsClient for Client {
    async fn create_assistant(&self, request: types::CreateAssistantRequest) -> Result<types::Assistant> {
        let assistant: types::Assistant = self.post_json("assistants", &request).await?;
        tracing::debug!("created assistant {} on {}", assistant.id(), assistant.model());
        Ok(assistant)
    }

    async fn delete_assistant(&self, assistant_id: &str) -> Result<types::DeletionStatus> {
        let status = self.delete_json(&format!("assistants/{}", assistant_id)).await?;
        Self::ensure_deleted(status)
    }

    async fn create_thread(&self) -> Result<types::Thread> {
        let thread: types::Thread = self.post_json("threads", &serde_json::json!({})).await?;
        tracing::debug!("created thread {}", thread.id());
        Ok(thread)
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<types::DeletionStatus> {
        let status = self.delete_json(&format!("threads/{}", thread_id)).await?;
        Self::ensure_deleted(status)
    }

    async fn create_message(
        &self,
        thread_id: &str,
        request: types::CreateMessageRequest,
    ) -> Result<types::ThreadMessage> {
        self.post_json(&format!("threads/{}/messages", thread_id), &request)
            .await
    }

    async fn create_run(&self, thread_id: &str, request: types::CreateRunRequest) -> Result<types::Run> {
        let run: types::Run = self
            .post_json(&format!("threads/{}/runs", thread_id), &request)
            .await?;
        tracing::debug!("created run {} status={}", run.id(), run.status().as_str());
        Ok(run)
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<types::Run> {
        let run: types::Run = self
            .get_json(&format!("threads/{}/runs/{}", thread_id, run_id))
            .await?;
        // Usage is only reported once the run reaches a terminal state.
        self.record_usage(run.usage());
        Ok(run)
    }

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<types::Run> {
        self.post_json(
            &format!("threads/{}/runs/{}/cancel", thread_id, run_id),
            &serde_json::json!({}),
        )
        .await
    }

    async fn list_messages(&self, thread_id: &str) -> Result<types::MessageList> {
        self.get_json(&format!(
            "threads/{}/messages?order=desc&limit={}",
            thread_id,
            consts::MESSAGE_PAGE_LIMIT
        ))
        .await
    }

    async fn create_chat_completion(
        &self,
        request: types::ChatCompletionRequest,
    ) -> Result<types::ChatCompletionResponse> {
        let response: types::ChatCompletionResponse =
            self.post_json("chat/completions", &request).await?;
        self.record_usage(response.usage());
        Ok(response)
    }

    async fn generate_image(&self, request: types::ImageGenerationRequest) -> Result<types::ImagesResponse> {
        self.post_json("images/generations", &request).await
    }

    async fn create_speech(&self, request: types::SpeechRequest) -> Result<ByteStream> {
        let response = self
            .http
            .post(self.config.url("audio/speech"))
            .json(&request)
            .send()
            .await?;
        let response = utils::check_response(response).await?;
        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(anyhow::Error::from))
            .boxed())
    }

    async fn download(&self, url: &str) -> Result<Bytes> {
        // Asset URLs are pre-signed; sending our bearer token along is not needed.
        let response = reqwest::get(url).await?;
        let response = utils::check_response(response).await?;
        Ok(response.bytes().await?)
    }
}

// Public function to create a client with a specific config.
pub fn connect_with_config(config: config::Config) -> Result<Client> {
    let headers = utils::build_headers(&config)?;
    let http = reqwest::Client::builder()
        .default_headers(headers)
        .build()
        .context("failed to build HTTP client")?;
    tracing::debug!("assistants client ready for {}", config.base_url());
    Ok(Client::new(http, config))
}

// Public function to connect with default settings.
pub fn connect() -> Result<Client> {
    connect_with_config(config::Config::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    // This is an integration test that makes a live call to the OpenAI API.
    // It is ignored by default to allow `cargo test` to run without requiring a live
    // API key. To run this test, use `cargo test -- --ignored`.
    #[tokio::test]
    #[ignore]
    async fn test_thread_lifecycle() {
        dotenvy::dotenv_override().ok();
        let client = connect().expect("client should build");

        let thread = client.create_thread().await.expect("thread should be created");
        let status = client
            .delete_thread(thread.id())
            .await
            .expect("thread should be deleted");
        assert!(status.deleted());

        // A second delete must surface the provider's not-found error.
        let again = client.delete_thread(thread.id()).await;
        assert!(again.is_err(), "second delete should fail");
    }

    // This is an integration test. See the note on `test_thread_lifecycle`.
    #[tokio::test]
    #[ignore]
    async fn test_speech_stream() {
        dotenvy::dotenv_override().ok();
        let client = connect().expect("client should build");

        let stream = client
            .create_speech(types::SpeechRequest::new("tts-1", "Once upon a time.", "nova"))
            .await
            .expect("speech request should succeed");
        let chunks: Vec<Bytes> = stream.try_collect().await.expect("stream should finish");
        let total: usize = chunks.iter().map(|c| c.len()).sum();
        println!("received {} bytes in {} chunks", total, chunks.len());
        assert!(total > 0);
    }
}
