use crate::config::Config;
use std::sync::Arc;
use storyteller_core::archive::SceneArchive;
use storyteller_core::background::BackgroundRequester;
use storyteller_core::prompts::Prompts;
use storyteller_core::provider::{SpeechProvider, StoryProvider};
use storyteller_core::session::SessionManager;
use storyteller_core::speech::SpeechStreamer;
use storyteller_core::turn::TurnExecutor;

/// Components shared by every request. Immutable once built.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub turns: Arc<TurnExecutor>,
    pub backgrounds: Arc<BackgroundRequester>,
    pub speech: Arc<SpeechStreamer>,
    /// Present only when an assets directory is configured.
    pub archive: Option<Arc<SceneArchive>>,
}

impl AppState {
    pub fn new(
        config: &Config,
        story: Arc<dyn StoryProvider>,
        speech: Arc<dyn SpeechProvider>,
        prompts: Prompts,
    ) -> Self {
        let prompts = Arc::new(prompts);
        let schema = config.reply_schema;

        let sessions = SessionManager::new(story.clone(), prompts.clone(), schema)
            .with_persona_model(&config.persona_model)
            .with_assistant_model(&config.assistant_model);
        let turns = TurnExecutor::new(story.clone(), prompts.clone(), schema).with_poll_policy(config.poll);
        let backgrounds = BackgroundRequester::new(story.clone()).with_model(&config.image_model);
        let speech = SpeechStreamer::new(speech)
            .with_voice(&config.tts_voice)
            .with_model(&config.tts_model);
        let archive = config.assets_dir.as_ref().map(|dir| {
            Arc::new(
                SceneArchive::new(dir, story.clone(), prompts.clone())
                    .with_chat_model(&config.assistant_model)
                    .with_image_model(&config.image_model),
            )
        });

        Self {
            sessions: Arc::new(sessions),
            turns: Arc::new(turns),
            backgrounds: Arc::new(backgrounds),
            speech: Arc::new(speech),
            archive,
        }
    }
}
