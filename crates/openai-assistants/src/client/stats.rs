use openai_assistants_types::Usage;

/// Token usage accumulated over the lifetime of a [`crate::Client`].
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Stats {
    total_tokens: i64,
    prompt_tokens: i64,
    completion_tokens: i64,
    requests: u64,
}

impl Stats {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn update_usage(&mut self, usage: &Usage) {
        self.total_tokens += usage.total_tokens();
        self.prompt_tokens += usage.prompt_tokens();
        self.completion_tokens += usage.completion_tokens();
        self.requests += 1;
    }

    pub fn total_tokens(&self) -> i64 {
        self.total_tokens
    }

    pub fn prompt_tokens(&self) -> i64 {
        self.prompt_tokens
    }

    pub fn completion_tokens(&self) -> i64 {
        self.completion_tokens
    }

    pub fn requests(&self) -> u64 {
        self.requests
    }
}
