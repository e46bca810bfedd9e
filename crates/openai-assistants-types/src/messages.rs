#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// Body of `POST /threads/{thread_id}/messages`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CreateMessageRequest {
    role: MessageRole,
    content: String,
}

impl CreateMessageRequest {
    pub fn new(role: MessageRole, content: &str) -> Self {
        Self {
            role,
            content: content.to_string(),
        }
    }

    pub fn role(&self) -> MessageRole {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ThreadMessage {
    id: String,
    role: MessageRole,
    #[serde(default)]
    content: Vec<MessageContent>,
    #[serde(default)]
    run_id: Option<String>,
}

impl ThreadMessage {
    pub fn new(id: &str, role: MessageRole) -> Self {
        Self {
            id: id.to_string(),
            role,
            content: Vec::new(),
            run_id: None,
        }
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.content.push(MessageContent::text(text));
        self
    }

    pub fn with_run_id(mut self, run_id: &str) -> Self {
        self.run_id = Some(run_id.to_string());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn role(&self) -> MessageRole {
        self.role
    }

    pub fn content(&self) -> &[MessageContent] {
        &self.content
    }

    pub fn run_id(&self) -> Option<&str> {
        self.run_id.as_deref()
    }

    /// Joins the text parts of the message, skipping images and unknown parts.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(MessageContent::as_text)
            .collect::<Vec<_>>()
            .join("")
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum MessageContent {
    #[serde(rename = "text")]
    Text { text: TextContent },
    #[serde(rename = "image_file")]
    ImageFile { image_file: serde_json::Value },
    #[serde(other)]
    Unsupported,
}

impl MessageContent {
    pub fn text(value: &str) -> Self {
        Self::Text {
            text: TextContent {
                value: value.to_string(),
                annotations: Vec::new(),
            },
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageContent::Text { text } => Some(text.value()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TextContent {
    value: String,
    #[serde(default)]
    annotations: Vec<serde_json::Value>,
}

impl TextContent {
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn annotations(&self) -> &[serde_json::Value] {
        &self.annotations
    }
}

/// Page returned by `GET /threads/{thread_id}/messages`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MessageList {
    data: Vec<ThreadMessage>,
    #[serde(default)]
    has_more: bool,
}

impl MessageList {
    pub fn new(data: Vec<ThreadMessage>) -> Self {
        Self {
            data,
            has_more: false,
        }
    }

    pub fn data(&self) -> &[ThreadMessage] {
        &self.data
    }

    pub fn into_data(self) -> Vec<ThreadMessage> {
        self.data
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }
}
