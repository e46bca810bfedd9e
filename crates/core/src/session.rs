use crate::error::Result;
use crate::generic_types::{CompletionRequest, Session};
use crate::prompts::Prompts;
use crate::provider::StoryProvider;
use crate::scene::{Character, GameSetup, ReplySchema};
use std::sync::Arc;

pub const DEFAULT_PERSONA_MODEL: &str = "gpt-4";
pub const DEFAULT_ASSISTANT_MODEL: &str = "gpt-4o";
pub const PERSONA_TEMPERATURE: f32 = 0.9;

const DEFAULT_PLAYER_NAME: &str = "Player";
const DEFAULT_STORY_PROMPT: &str = "an adventure";

/// What `create` hands back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SessionHandle {
    #[serde(flatten)]
    pub session: Session,
    /// The full instructions the assistant was created with.
    pub instructions: String,
    /// The persona text as written by the persona model, before the block rules.
    pub persona: String,
}

/// Creates and tears down the remote assistant + thread pair behind a game.
pub struct SessionManager {
    provider: Arc<dyn StoryProvider>,
    prompts: Arc<Prompts>,
    schema: ReplySchema,
    persona_model: String,
    assistant_model: String,
}

impl SessionManager {
    pub fn new(provider: Arc<dyn StoryProvider>, prompts: Arc<Prompts>, schema: ReplySchema) -> Self {
        Self {
            provider,
            prompts,
            schema,
            persona_model: DEFAULT_PERSONA_MODEL.to_string(),
            assistant_model: DEFAULT_ASSISTANT_MODEL.to_string(),
        }
    }

    pub fn with_persona_model(mut self, model: &str) -> Self {
        self.persona_model = model.to_string();
        self
    }

    pub fn with_assistant_model(mut self, model: &str) -> Self {
        self.assistant_model = model.to_string();
        self
    }

    pub async fn create(&self, setup: &GameSetup) -> Result<SessionHandle> {
        let request = CompletionRequest {
            model: self.persona_model.clone(),
            system: self.prompts.persona_designer().to_string(),
            user: persona_request(setup),
            temperature: Some(PERSONA_TEMPERATURE),
            json_object: false,
        };
        let persona = self.provider.complete(request).await?.trim().to_string();
        tracing::debug!("persona instructions: {} chars", persona.len());

        let instructions = compose_instructions(&persona, self.prompts.block_rules(self.schema));

        let assistant_id = self
            .provider
            .create_assistant(&self.assistant_model, &instructions)
            .await?;

        let thread_id = match self.provider.create_thread().await {
            Ok(thread_id) => thread_id,
            Err(e) => {
                // Don't leave an orphaned assistant behind.
                if let Err(cleanup) = self.provider.delete_assistant(&assistant_id).await {
                    tracing::warn!("failed to delete assistant {}: {:#}", assistant_id, cleanup);
                }
                return Err(e.into());
            }
        };

        tracing::info!("session created: assistant={} thread={}", assistant_id, thread_id);
        Ok(SessionHandle {
            session: Session {
                assistant_id,
                thread_id,
            },
            instructions,
            persona,
        })
    }

    /// Deletes the assistant, then the thread. Errors are surfaced as they are,
    /// so destroying a session twice fails on the second call.
    pub async fn destroy(&self, session: &Session) -> Result<()> {
        self.provider.delete_assistant(&session.assistant_id).await?;
        self.provider.delete_thread(&session.thread_id).await?;
        tracing::info!(
            "session deleted: assistant={} thread={}",
            session.assistant_id,
            session.thread_id
        );
        Ok(())
    }
}

fn persona_request(setup: &GameSetup) -> String {
    let name = non_blank(setup.player_name.as_deref()).unwrap_or(DEFAULT_PLAYER_NAME);
    let prompt = non_blank(setup.story_prompt.as_deref()).unwrap_or(DEFAULT_STORY_PROMPT);
    let roster = character_roster(&setup.characters);
    format!(
        "Player Name: {}\nStory Prompt: {}\nCharacters: {}",
        name,
        prompt,
        if roster.is_empty() { "None specified" } else { roster.as_str() }
    )
}

fn character_roster(characters: &[Character]) -> String {
    characters
        .iter()
        .map(|c| format!("\n- {} - {}", c.name, c.role))
        .collect()
}

fn compose_instructions(persona: &str, rules: &str) -> String {
    format!("{}\n\n---\n\n{}", persona, rules)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
