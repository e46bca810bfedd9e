use crate::config::Config;
use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use openai_assistants::types;
use openai_assistants::{AssistantsClient, ClientConfig};
use secrecy::ExposeSecret;
use storyteller_core::generic_types::{
    CompletionRequest, ImageRequest, ReplyMessage, Role, RunState, Session, SpeechRequest,
};
use storyteller_core::provider::{AudioStream, SpeechProvider, StoryProvider};

const ASSISTANT_NAME: &str = "Storyteller";

/// An adapter that implements the story provider traits for the
/// `openai_assistants::Client`. It is generic over `AssistantsClient` so the
/// underlying client can be mocked in tests.
pub struct OpenAIAdapter<C: AssistantsClient> {
    client: C,
}

impl OpenAIAdapter<openai_assistants::Client> {
    pub fn connect(config: &Config) -> Result<Self> {
        let mut builder = ClientConfig::builder().with_api_key(config.openai_api_key.expose_secret());
        if let Some(base_url) = &config.openai_base_url {
            builder = builder.with_base_url(base_url);
        }
        let client = openai_assistants::connect_with_config(builder.build())
            .context("Failed to create the OpenAI client")?;
        Ok(Self { client })
    }
}

impl<C: AssistantsClient> OpenAIAdapter<C> {
    pub fn client(&self) -> &C {
        &self.client
    }
}

fn run_state(status: types::RunStatus) -> RunState {
    match status {
        types::RunStatus::Queued => RunState::Queued,
        types::RunStatus::InProgress => RunState::InProgress,
        types::RunStatus::RequiresAction => RunState::RequiresAction,
        types::RunStatus::Cancelling => RunState::Cancelling,
        types::RunStatus::Cancelled => RunState::Cancelled,
        types::RunStatus::Failed => RunState::Failed,
        types::RunStatus::Completed => RunState::Completed,
        types::RunStatus::Incomplete => RunState::Incomplete,
        types::RunStatus::Expired => RunState::Expired,
        types::RunStatus::Unknown => RunState::Unknown,
    }
}

#[async_trait]
impl<C: AssistantsClient> StoryProvider for OpenAIAdapter<C> {
    async fn create_assistant(&self, model: &str, instructions: &str) -> Result<String> {
        let request = types::CreateAssistantRequest::new(model, instructions).with_name(ASSISTANT_NAME);
        let assistant = self.client.create_assistant(request).await?;
        Ok(assistant.id().to_string())
    }

    async fn delete_assistant(&self, assistant_id: &str) -> Result<()> {
        self.client.delete_assistant(assistant_id).await?;
        Ok(())
    }

    async fn create_thread(&self) -> Result<String> {
        let thread = self.client.create_thread().await?;
        Ok(thread.id().to_string())
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        self.client.delete_thread(thread_id).await?;
        Ok(())
    }

    async fn append_user_message(&self, thread_id: &str, text: &str) -> Result<()> {
        let request = types::CreateMessageRequest::new(types::MessageRole::User, text);
        self.client.create_message(thread_id, request).await?;
        Ok(())
    }

    async fn start_run(&self, session: &Session, additional_instructions: Option<String>) -> Result<String> {
        let mut request = types::CreateRunRequest::new(&session.assistant_id);
        if let Some(instructions) = additional_instructions {
            request = request.with_additional_instructions(&instructions);
        }
        let run = self.client.create_run(&session.thread_id, request).await?;
        Ok(run.id().to_string())
    }

    async fn run_state(&self, thread_id: &str, run_id: &str) -> Result<RunState> {
        let run = self.client.retrieve_run(thread_id, run_id).await?;
        if let Some(error) = run.last_error() {
            tracing::warn!("run {} reported {}: {}", run_id, error.code(), error.message());
        }
        Ok(run_state(run.status()))
    }

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<()> {
        self.client.cancel_run(thread_id, run_id).await?;
        Ok(())
    }

    async fn recent_messages(&self, thread_id: &str) -> Result<Vec<ReplyMessage>> {
        let messages = self.client.list_messages(thread_id).await?;
        Ok(messages
            .into_data()
            .into_iter()
            .map(|message| ReplyMessage {
                role: match message.role() {
                    types::MessageRole::User => Role::User,
                    types::MessageRole::Assistant => Role::Assistant,
                },
                text: message.text(),
            })
            .collect())
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let mut chat = types::ChatCompletionRequest::new(&request.model)
            .with_message(types::ChatMessage::system(&request.system))
            .with_message(types::ChatMessage::user(&request.user));
        if let Some(temperature) = request.temperature {
            chat = chat.with_temperature(temperature);
        }
        if request.json_object {
            chat = chat.with_json_object_format();
        }
        let response = self.client.create_chat_completion(chat).await?;
        response
            .first_content()
            .map(str::to_string)
            .context("chat completion returned no content")
    }

    async fn generate_image(&self, request: ImageRequest) -> Result<Option<String>> {
        let image = types::ImageGenerationRequest::new(&request.model, &request.prompt)
            .with_size(&request.size)
            .with_quality(&request.quality);
        let response = self.client.generate_image(image).await?;
        Ok(response.first_url().map(str::to_string))
    }

    async fn download(&self, url: &str) -> Result<Bytes> {
        self.client.download(url).await
    }
}

#[async_trait]
impl<C: AssistantsClient> SpeechProvider for OpenAIAdapter<C> {
    async fn synthesize(&self, request: SpeechRequest) -> Result<AudioStream> {
        let speech = types::SpeechRequest::new(&request.model, &request.text, &request.voice);
        self.client.create_speech(speech).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use futures::stream::{self, StreamExt};
    use mockall::mock;
    use openai_assistants::ByteStream;

    mock! {
        pub Client {}
        #[async_trait]
        impl AssistantsClient for Client {
            async fn create_assistant(&self, request: types::CreateAssistantRequest) -> Result<types::Assistant>;
            async fn delete_assistant(&self, assistant_id: &str) -> Result<types::DeletionStatus>;
            async fn create_thread(&self) -> Result<types::Thread>;
            async fn delete_thread(&self, thread_id: &str) -> Result<types::DeletionStatus>;
            async fn create_message(&self, thread_id: &str, request: types::CreateMessageRequest) -> Result<types::ThreadMessage>;
            async fn create_run(&self, thread_id: &str, request: types::CreateRunRequest) -> Result<types::Run>;
            async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<types::Run>;
            async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<types::Run>;
            async fn list_messages(&self, thread_id: &str) -> Result<types::MessageList>;
            async fn create_chat_completion(&self, request: types::ChatCompletionRequest) -> Result<types::ChatCompletionResponse>;
            async fn generate_image(&self, request: types::ImageGenerationRequest) -> Result<types::ImagesResponse>;
            async fn create_speech(&self, request: types::SpeechRequest) -> Result<ByteStream>;
            async fn download(&self, url: &str) -> Result<Bytes>;
        }
    }

    fn adapter(client: MockClient) -> OpenAIAdapter<MockClient> {
        OpenAIAdapter { client }
    }

    #[tokio::test]
    async fn test_start_run_passes_additional_instructions() {
        let mut client = MockClient::new();
        client
            .expect_create_run()
            .withf(|thread_id, request| {
                thread_id == "thread_1"
                    && request.assistant_id() == "asst_1"
                    && request.additional_instructions() == Some("imagine only")
            })
            .times(1)
            .returning(|thread_id, _| Ok(types::Run::new("run_1", thread_id, types::RunStatus::Queued)));

        let run_id = adapter(client)
            .start_run(&Session::new("asst_1", "thread_1"), Some("imagine only".to_string()))
            .await
            .unwrap();
        assert_eq!(run_id, "run_1");
    }

    #[tokio::test]
    async fn test_run_state_maps_status() {
        let mut client = MockClient::new();
        client
            .expect_retrieve_run()
            .returning(|thread_id, run_id| Ok(types::Run::new(run_id, thread_id, types::RunStatus::Expired)));

        let state = adapter(client).run_state("thread_1", "run_1").await.unwrap();
        assert_eq!(state, RunState::Expired);
    }

    #[tokio::test]
    async fn test_recent_messages_keep_order_and_roles() {
        let mut client = MockClient::new();
        client.expect_list_messages().times(1).returning(|_| {
            Ok(types::MessageList::new(vec![
                types::ThreadMessage::new("msg_2", types::MessageRole::Assistant).with_text("{\"blocks\": []}"),
                types::ThreadMessage::new("msg_1", types::MessageRole::User).with_text("Open the door"),
            ]))
        });

        let messages = adapter(client).recent_messages("thread_1").await.unwrap();
        assert_eq!(
            messages,
            vec![
                ReplyMessage::assistant("{\"blocks\": []}"),
                ReplyMessage::user("Open the door"),
            ]
        );
    }

    #[tokio::test]
    async fn test_complete_builds_chat_request() {
        let mut client = MockClient::new();
        client
            .expect_create_chat_completion()
            .withf(|request| {
                request.model() == "gpt-4"
                    && request.temperature() == Some(0.9)
                    && request.messages().len() == 2
                    && request.messages()[0].role() == types::ChatRole::System
                    && request.messages()[1].content() == "Player Name: Ada"
            })
            .times(1)
            .returning(|_| {
                Ok(serde_json::from_value(serde_json::json!({
                    "choices": [{"message": {"content": "You are a wry narrator."}, "finish_reason": "stop"}],
                    "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
                }))
                .unwrap())
            });

        let text = adapter(client)
            .complete(CompletionRequest {
                model: "gpt-4".to_string(),
                system: "Design a persona.".to_string(),
                user: "Player Name: Ada".to_string(),
                temperature: Some(0.9),
                json_object: false,
            })
            .await
            .unwrap();
        assert_eq!(text, "You are a wry narrator.");
    }

    #[tokio::test]
    async fn test_generate_image_returns_first_url() {
        let mut client = MockClient::new();
        client
            .expect_generate_image()
            .withf(|request| request.prompt() == "a sunset" && request.size() == "1024x1024")
            .returning(|_| {
                Ok(types::ImagesResponse::new(vec![types::ImageData::with_url(
                    "https://images.example/1.png",
                )]))
            });

        let url = adapter(client)
            .generate_image(ImageRequest {
                model: "dall-e-3".to_string(),
                prompt: "a sunset".to_string(),
                size: "1024x1024".to_string(),
                quality: "standard".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(url.as_deref(), Some("https://images.example/1.png"));
    }

    #[tokio::test]
    async fn test_provider_errors_pass_through() {
        let mut client = MockClient::new();
        client
            .expect_delete_thread()
            .returning(|_| Err(anyhow::anyhow!("404 Not Found: No thread found with id 'thread_1'.")));

        let err = adapter(client).delete_thread("thread_1").await.unwrap_err();
        assert_eq!(err.to_string(), "404 Not Found: No thread found with id 'thread_1'.");
    }

    #[tokio::test]
    async fn test_synthesize_forwards_stream() {
        let mut client = MockClient::new();
        client
            .expect_create_speech()
            .withf(|request| request.voice() == "nova" && request.input() == "Hello")
            .returning(|_| Ok(stream::iter(vec![Ok(Bytes::from_static(b"ID3"))]).boxed()));

        let stream = adapter(client)
            .synthesize(SpeechRequest {
                model: "tts-1-hd".to_string(),
                voice: "nova".to_string(),
                text: "Hello".to_string(),
            })
            .await
            .unwrap();
        let chunks: Vec<Bytes> = stream.try_collect().await.unwrap();
        assert_eq!(chunks, vec![Bytes::from_static(b"ID3")]);
    }
}
