pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";

pub const BASE_URL: &str = "https://api.openai.com/v1";

pub const AUTHORIZATION_HEADER: &str = "Authorization";
pub const OPENAI_BETA_HEADER: &str = "OpenAI-Beta";
pub const ASSISTANTS_BETA: &str = "assistants=v2";

/// Messages fetched per page when looking for the newest assistant reply.
pub const MESSAGE_PAGE_LIMIT: u32 = 20;
