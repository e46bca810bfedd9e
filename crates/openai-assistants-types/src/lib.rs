//! Wire types for the hosted assistants, chat, image and speech endpoints.
pub mod assistants;
pub mod chat;
pub mod error;
pub mod images;
pub mod messages;
pub mod runs;
pub mod speech;

//re-export types for easier access
pub use assistants::{Assistant, CreateAssistantRequest, DeletionStatus, Thread};
pub use chat::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ChatRole};
pub use error::{ErrorDetails, ErrorResponse};
pub use images::{ImageData, ImageGenerationRequest, ImagesResponse};
pub use messages::{CreateMessageRequest, MessageContent, MessageList, MessageRole, ThreadMessage};
pub use runs::{CreateRunRequest, Run, RunStatus, Usage};
pub use speech::SpeechRequest;
