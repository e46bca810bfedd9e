//! One story turn: append the player's line, run the assistant, wait for it
//! and hand back the validated scene.
use crate::error::{Result, StoryError};
use crate::generic_types::{Role, RunState, Session};
use crate::prompts::Prompts;
use crate::provider::StoryProvider;
use crate::reply::parse_reply;
use crate::scene::{ReplySchema, SceneReply};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_MAX_POLL_INTERVAL: Duration = Duration::from_secs(4);
pub const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(120);

/// How the executor waits for a run to settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub multiplier: u32,
    /// Upper bound on the whole wait, from the first status check.
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_interval: DEFAULT_POLL_INTERVAL,
            max_interval: DEFAULT_MAX_POLL_INTERVAL,
            multiplier: 2,
            timeout: DEFAULT_RUN_TIMEOUT,
        }
    }
}

impl PollPolicy {
    pub fn next_interval(&self, current: Duration) -> Duration {
        current
            .saturating_mul(self.multiplier.max(1))
            .min(self.max_interval)
    }
}

/// The player's input for one turn.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TurnInput {
    pub message: String,
    /// A prebuffering request: the model should imagine the branch without
    /// treating the choice as taken.
    pub speculative: bool,
}

impl TurnInput {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
            speculative: false,
        }
    }

    pub fn speculative(message: &str) -> Self {
        Self {
            message: message.to_string(),
            speculative: true,
        }
    }
}

pub struct TurnExecutor {
    provider: Arc<dyn StoryProvider>,
    prompts: Arc<Prompts>,
    schema: ReplySchema,
    poll: PollPolicy,
}

impl TurnExecutor {
    pub fn new(provider: Arc<dyn StoryProvider>, prompts: Arc<Prompts>, schema: ReplySchema) -> Self {
        Self {
            provider,
            prompts,
            schema,
            poll: PollPolicy::default(),
        }
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub async fn run_turn(&self, session: &Session, input: &TurnInput) -> Result<SceneReply> {
        if session.assistant_id.trim().is_empty() {
            return Err(StoryError::MissingField("assistant_id"));
        }
        if session.thread_id.trim().is_empty() {
            return Err(StoryError::MissingField("thread_id"));
        }
        if input.message.trim().is_empty() {
            return Err(StoryError::MissingField("message"));
        }

        let additional_instructions = input
            .speculative
            .then(|| self.prompts.speculative_turn().to_string());

        self.provider
            .append_user_message(&session.thread_id, &input.message)
            .await?;
        let run_id = self
            .provider
            .start_run(session, additional_instructions)
            .await?;
        tracing::debug!(
            "run {} started on thread {} (speculative={})",
            run_id,
            session.thread_id,
            input.speculative
        );

        let state = match tokio::time::timeout(
            self.poll.timeout,
            self.wait_for_run(&session.thread_id, &run_id),
        )
        .await
        {
            Ok(state) => state?,
            Err(_) => {
                tracing::warn!("run {} timed out after {:?}", run_id, self.poll.timeout);
                if let Err(e) = self.provider.cancel_run(&session.thread_id, &run_id).await {
                    tracing::warn!("failed to cancel run {}: {:#}", run_id, e);
                }
                return Err(StoryError::Timeout(self.poll.timeout));
            }
        };

        if state != RunState::Completed {
            tracing::warn!("run {} ended with status {}", run_id, state);
            return Err(StoryError::GenerationFailed(state));
        }

        let messages = self.provider.recent_messages(&session.thread_id).await?;
        let reply = messages
            .into_iter()
            .find(|m| m.role == Role::Assistant)
            .ok_or(StoryError::NoAssistantReply)?;

        let scene = parse_reply(&reply.text, self.schema);
        if let Err(StoryError::MalformedReply { reason, .. }) = &scene {
            tracing::warn!("assistant reply on run {} rejected: {}", run_id, reason);
        }
        scene
    }

    /// Polls until the run reaches a terminal state. Not bounded on its own.
    async fn wait_for_run(&self, thread_id: &str, run_id: &str) -> Result<RunState> {
        let mut interval = self.poll.initial_interval;
        loop {
            let state = self.provider.run_state(thread_id, run_id).await?;
            if state.is_terminal() {
                return Ok(state);
            }
            tracing::trace!("run {} is {}, next check in {:?}", run_id, state, interval);
            tokio::time::sleep(interval).await;
            interval = self.poll.next_interval(interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generic_types::ReplyMessage;
    use crate::provider::MockStoryProvider;
    use crate::scene::Block;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const REPLY: &str = r#"{"scene_id": 2, "description": "A ferry deck at night.", "blocks": [
        {"type": "narration", "text": "The engines hum."},
        {"type": "story_prompt", "character": "Captain", "question": "Where to?", "choices": ["North", "South"]}
    ]}"#;

    fn fast_policy() -> PollPolicy {
        PollPolicy {
            initial_interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(4),
            multiplier: 2,
            timeout: Duration::from_millis(200),
        }
    }

    fn executor(provider: MockStoryProvider) -> TurnExecutor {
        TurnExecutor::new(
            Arc::new(provider),
            Arc::new(Prompts::default()),
            ReplySchema::SceneObject,
        )
        .with_poll_policy(fast_policy())
    }

    fn session() -> Session {
        Session::new("asst_1", "thread_1")
    }

    /// Expects the message/run calls of a normal turn.
    fn expect_start(provider: &mut MockStoryProvider) {
        provider
            .expect_append_user_message()
            .withf(|thread_id, text| thread_id == "thread_1" && text == "Open the hatch")
            .times(1)
            .returning(|_, _| Ok(()));
        provider
            .expect_start_run()
            .withf(|session, instructions| session.assistant_id == "asst_1" && instructions.is_none())
            .times(1)
            .returning(|_, _| Ok("run_1".to_string()));
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = PollPolicy::default();
        let mut interval = policy.initial_interval;
        let mut seen = Vec::new();
        for _ in 0..6 {
            seen.push(interval.as_millis());
            interval = policy.next_interval(interval);
        }
        assert_eq!(seen, vec![500, 1000, 2000, 4000, 4000, 4000]);
    }

    #[tokio::test]
    async fn test_completed_run_returns_scene() {
        let mut provider = MockStoryProvider::new();
        expect_start(&mut provider);

        let polls = Arc::new(AtomicUsize::new(0));
        let counter = polls.clone();
        provider.expect_run_state().returning(move |_, _| {
            // queued, in_progress, then completed
            Ok(match counter.fetch_add(1, Ordering::SeqCst) {
                0 => RunState::Queued,
                1 => RunState::InProgress,
                _ => RunState::Completed,
            })
        });
        provider.expect_recent_messages().times(1).returning(|_| {
            Ok(vec![
                ReplyMessage::assistant(REPLY),
                ReplyMessage::user("Open the hatch"),
            ])
        });

        let scene = executor(provider)
            .run_turn(&session(), &TurnInput::new("Open the hatch"))
            .await
            .unwrap();

        assert_eq!(polls.load(Ordering::SeqCst), 3);
        assert_eq!(scene.scene_id(), Some(2));
        assert!(matches!(scene.blocks()[0], Block::Narration { .. }));
    }

    #[tokio::test]
    async fn test_failed_and_cancelled_runs() {
        for status in [RunState::Failed, RunState::Cancelled, RunState::Expired] {
            let mut provider = MockStoryProvider::new();
            expect_start(&mut provider);
            provider.expect_run_state().returning(move |_, _| Ok(status));
            provider.expect_recent_messages().never();

            let err = executor(provider)
                .run_turn(&session(), &TurnInput::new("Open the hatch"))
                .await
                .unwrap_err();

            assert!(matches!(err, StoryError::GenerationFailed(s) if s == status));
            assert_eq!(err.to_string(), format!("Run status: {}", status));
        }
    }

    #[tokio::test]
    async fn test_no_assistant_reply() {
        let mut provider = MockStoryProvider::new();
        expect_start(&mut provider);
        provider
            .expect_run_state()
            .returning(|_, _| Ok(RunState::Completed));
        provider
            .expect_recent_messages()
            .returning(|_| Ok(vec![ReplyMessage::user("Open the hatch")]));

        let err = executor(provider)
            .run_turn(&session(), &TurnInput::new("Open the hatch"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoryError::NoAssistantReply));
    }

    #[tokio::test]
    async fn test_malformed_reply_keeps_raw_text() {
        let mut provider = MockStoryProvider::new();
        expect_start(&mut provider);
        provider
            .expect_run_state()
            .returning(|_, _| Ok(RunState::Completed));
        provider
            .expect_recent_messages()
            .returning(|_| Ok(vec![ReplyMessage::assistant("The hatch creaks open.")]));

        let err = executor(provider)
            .run_turn(&session(), &TurnInput::new("Open the hatch"))
            .await
            .unwrap_err();
        match err {
            StoryError::MalformedReply { raw, .. } => assert_eq!(raw, "The hatch creaks open."),
            other => panic!("expected MalformedReply, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_speculative_turn_sends_run_instructions() {
        let mut provider = MockStoryProvider::new();
        provider
            .expect_append_user_message()
            .times(1)
            .returning(|_, _| Ok(()));
        provider
            .expect_start_run()
            .withf(|_, instructions| {
                instructions
                    .as_deref()
                    .is_some_and(|text| text.starts_with("[This is a prebuffering request"))
            })
            .times(1)
            .returning(|_, _| Ok("run_1".to_string()));
        provider
            .expect_run_state()
            .returning(|_, _| Ok(RunState::Completed));
        provider
            .expect_recent_messages()
            .returning(|_| Ok(vec![ReplyMessage::assistant(REPLY)]));

        let scene = executor(provider)
            .run_turn(&session(), &TurnInput::speculative("Take the left door"))
            .await
            .unwrap();
        assert_eq!(scene.blocks().len(), 2);
    }

    #[tokio::test]
    async fn test_stuck_run_times_out_and_is_cancelled() {
        let mut provider = MockStoryProvider::new();
        expect_start(&mut provider);
        provider
            .expect_run_state()
            .returning(|_, _| Ok(RunState::InProgress));
        provider
            .expect_cancel_run()
            .withf(|thread_id, run_id| thread_id == "thread_1" && run_id == "run_1")
            .times(1)
            .returning(|_, _| Ok(()));
        provider.expect_recent_messages().never();

        let policy = PollPolicy {
            timeout: Duration::from_millis(30),
            ..fast_policy()
        };
        let err = executor(provider)
            .with_poll_policy(policy)
            .run_turn(&session(), &TurnInput::new("Open the hatch"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoryError::Timeout(d) if d == Duration::from_millis(30)));
    }

    #[tokio::test]
    async fn test_remote_failure_is_not_retried() {
        let mut provider = MockStoryProvider::new();
        provider
            .expect_append_user_message()
            .times(1)
            .returning(|_, _| Err(anyhow::anyhow!("404 Not Found: No thread found with id 'thread_1'.")));
        provider.expect_start_run().never();

        let err = executor(provider)
            .run_turn(&session(), &TurnInput::new("Open the hatch"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoryError::RemoteCallFailed(_)));
        assert_eq!(err.to_string(), "404 Not Found: No thread found with id 'thread_1'.");
    }

    #[tokio::test]
    async fn test_blank_message_is_rejected() {
        let provider = MockStoryProvider::new();
        let err = executor(provider)
            .run_turn(&session(), &TurnInput::new("  "))
            .await
            .unwrap_err();
        assert!(matches!(err, StoryError::MissingField("message")));
    }
}
