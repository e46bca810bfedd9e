/// Lifecycle states of a run, as reported by `GET /threads/{thread_id}/runs/{run_id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::RequiresAction => "requires_action",
            RunStatus::Cancelling => "cancelling",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Failed => "failed",
            RunStatus::Completed => "completed",
            RunStatus::Incomplete => "incomplete",
            RunStatus::Expired => "expired",
            RunStatus::Unknown => "unknown",
        }
    }
}

/// Body of `POST /threads/{thread_id}/runs`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CreateRunRequest {
    assistant_id: String,

    /// Appended to the assistant instructions for this run only.
    #[serde(skip_serializing_if = "Option::is_none")]
    additional_instructions: Option<String>,
}

impl CreateRunRequest {
    pub fn new(assistant_id: &str) -> Self {
        Self {
            assistant_id: assistant_id.to_string(),
            additional_instructions: None,
        }
    }

    pub fn with_additional_instructions(mut self, instructions: &str) -> Self {
        self.additional_instructions = Some(instructions.to_string());
        self
    }

    pub fn assistant_id(&self) -> &str {
        &self.assistant_id
    }

    pub fn additional_instructions(&self) -> Option<&str> {
        self.additional_instructions.as_deref()
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Run {
    id: String,
    thread_id: String,
    status: RunStatus,
    #[serde(default)]
    last_error: Option<RunError>,
    #[serde(default)]
    usage: Option<Usage>,
}

impl Run {
    pub fn new(id: &str, thread_id: &str, status: RunStatus) -> Self {
        Self {
            id: id.to_string(),
            thread_id: thread_id.to_string(),
            status,
            last_error: None,
            usage: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn last_error(&self) -> Option<&RunError> {
        self.last_error.as_ref()
    }

    pub fn usage(&self) -> Option<&Usage> {
        self.usage.as_ref()
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RunError {
    code: String,
    message: String,
}

impl RunError {
    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Token accounting shared by runs and chat completions.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Usage {
    #[serde(default)]
    prompt_tokens: i64,
    #[serde(default)]
    completion_tokens: i64,
    #[serde(default)]
    total_tokens: i64,
}

impl Usage {
    pub fn prompt_tokens(&self) -> i64 {
        self.prompt_tokens
    }

    pub fn completion_tokens(&self) -> i64 {
        self.completion_tokens
    }

    pub fn total_tokens(&self) -> i64 {
        self.total_tokens
    }
}
