//! Generation orchestration
//!
//! The assistant drives one session through a question: policy selection,
//! prompt rendering, the streaming request, and the hand-off to feedback.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Duration;

use coderzz_models::ModelInfo;
use coderzz_models::providers::{ChatRequest, Message, ModelProvider, Usage};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::SessionError;
use crate::feedback::Feedback;
use crate::input::QuerySource;
use crate::session::{FeedbackOutcome, PreparedPrompt, Session, SharedSession};
use crate::stream::{StreamOutcome, accumulate};

pub const DEFAULT_MODEL: &str = "codellama";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are Coderzz.AI, a coding assistant. Reply with working code and brief explanations.";

/// How generation requests are built
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub model: String,
    pub system_prompt: Option<String>,
    pub temperature: Option<f32>,
    pub timeout: Duration,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            system_prompt: Some(DEFAULT_SYSTEM_PROMPT.to_string()),
            temperature: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// A completed generation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Generation {
    #[serde(flatten)]
    pub prompt: PreparedPrompt,
    pub code: String,
    pub chunks: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

#[derive(Clone)]
pub struct Assistant {
    provider: Arc<dyn ModelProvider>,
    settings: GenerationSettings,
}

impl Assistant {
    pub fn new(provider: Arc<dyn ModelProvider>, settings: GenerationSettings) -> Self {
        Self { provider, settings }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn models(&self) -> Vec<ModelInfo> {
        self.provider.models()
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    /// Answer a new question with a policy-chosen template.
    ///
    /// `display` receives the accumulated text after each streamed chunk.
    pub async fn generate<F>(
        &self,
        session: &mut Session,
        question: &str,
        source: QuerySource,
        display: F,
    ) -> Result<Generation, SessionError>
    where
        F: FnMut(&str) + Send,
    {
        let prepared = session.begin(question, source)?;
        self.run(session, prepared, display).await
    }

    /// Answer a new question with a caller-chosen template.
    pub async fn generate_with_action<F>(
        &self,
        session: &mut Session,
        question: &str,
        source: QuerySource,
        action: usize,
        display: F,
    ) -> Result<Generation, SessionError>
    where
        F: FnMut(&str) + Send,
    {
        let prepared = session.begin_with_action(question, source, action)?;
        self.run(session, prepared, display).await
    }

    /// Re-ask the last question with an explicit template.
    pub async fn regenerate<F>(
        &self,
        session: &mut Session,
        action: usize,
        display: F,
    ) -> Result<Generation, SessionError>
    where
        F: FnMut(&str) + Send,
    {
        let prepared = session.begin_again(action)?;
        self.run(session, prepared, display).await
    }

    /// Run a generation against a session shared with other callers.
    ///
    /// `begin` prepares the prompt under the session lock. The lock is then
    /// released while the model streams, so snapshots stay readable and a
    /// second generation is refused by the state machine instead of queueing.
    /// A session reset during the stream supersedes this generation and its
    /// result is discarded.
    pub async fn generate_shared<B, F>(
        &self,
        shared: &SharedSession,
        begin: B,
        display: F,
    ) -> Result<Generation, SessionError>
    where
        B: FnOnce(&mut Session) -> Result<PreparedPrompt, SessionError> + Send,
        F: FnMut(&str) + Send,
    {
        let (prepared, generation) = {
            let mut session = shared.lock().await;
            let prepared = begin(&mut *session)?;
            (prepared, session.generation_id())
        };
        let _in_flight = SharedInFlight {
            session: shared.clone(),
            generation,
        };

        let request = self.request_for(&prepared.prompt);
        self.log_request(&prepared);
        let result = self
            .with_timeout(self.stream_shared(shared, generation, request, display))
            .await;

        let mut session = shared.lock().await;
        if session.generation_id() != generation {
            return Err(superseded(generation));
        }
        self.finish(&mut session, prepared, result)
    }

    /// Close the feedback loop for the session's pending answer.
    pub fn feedback(
        &self,
        session: &mut Session,
        feedback: Option<Feedback>,
    ) -> Result<FeedbackOutcome, SessionError> {
        session.apply_feedback(feedback)
    }

    fn request_for(&self, prompt: &str) -> ChatRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &self.settings.system_prompt {
            messages.push(Message::system(system.clone()));
        }
        messages.push(Message::user(prompt));

        let request = ChatRequest::new(self.settings.model.clone(), messages);
        match self.settings.temperature {
            Some(t) => request.temperature(t),
            None => request,
        }
    }

    async fn run<F>(
        &self,
        session: &mut Session,
        prepared: PreparedPrompt,
        display: F,
    ) -> Result<Generation, SessionError>
    where
        F: FnMut(&str) + Send,
    {
        let generation = session.generation_id();
        let mut session = InFlight {
            session,
            generation,
        };

        let request = self.request_for(&prepared.prompt);
        self.log_request(&prepared);
        let result = self
            .with_timeout(self.stream(&mut session, request, display))
            .await;
        self.finish(&mut session, prepared, result)
    }

    fn log_request(&self, prepared: &PreparedPrompt) {
        debug!(
            provider = self.provider.name(),
            model = %self.settings.model,
            action = prepared.action,
            "Sending generation request"
        );
    }

    async fn with_timeout<Fut>(&self, stream: Fut) -> Result<StreamOutcome, SessionError>
    where
        Fut: Future<Output = Result<StreamOutcome, SessionError>>,
    {
        let timeout = self.settings.timeout;
        match tokio::time::timeout(timeout, stream).await {
            Ok(result) => result,
            Err(_) => Err(SessionError::Timeout(timeout)),
        }
    }

    fn finish(
        &self,
        session: &mut Session,
        prepared: PreparedPrompt,
        result: Result<StreamOutcome, SessionError>,
    ) -> Result<Generation, SessionError> {
        let outcome = match result {
            Ok(outcome) if outcome.text.trim().is_empty() => {
                let err = SessionError::Generation("model returned no text".to_string());
                session.fail(&err);
                return Err(err);
            }
            Ok(outcome) => outcome,
            Err(err) => {
                session.fail(&err);
                return Err(err);
            }
        };

        session.complete(outcome.text.clone())?;
        info!(
            session_id = %session.id(),
            action = prepared.action,
            chunks = outcome.chunks,
            "Generation complete"
        );

        Ok(Generation {
            prompt: prepared,
            code: outcome.text,
            chunks: outcome.chunks,
            usage: outcome.usage,
        })
    }

    async fn stream<F>(
        &self,
        session: &mut Session,
        request: ChatRequest,
        display: F,
    ) -> Result<StreamOutcome, SessionError>
    where
        F: FnMut(&str) + Send,
    {
        let stream = self.provider.chat_stream(request).await?;
        session.mark_streaming()?;
        Ok(accumulate(stream, display).await?)
    }

    async fn stream_shared<F>(
        &self,
        shared: &SharedSession,
        generation: u64,
        request: ChatRequest,
        display: F,
    ) -> Result<StreamOutcome, SessionError>
    where
        F: FnMut(&str) + Send,
    {
        let stream = self.provider.chat_stream(request).await?;
        {
            let mut session = shared.lock().await;
            if session.generation_id() != generation {
                return Err(superseded(generation));
            }
            session.mark_streaming()?;
        }
        Ok(accumulate(stream, display).await?)
    }
}

fn superseded(generation: u64) -> SessionError {
    SessionError::InvalidState {
        expected: format!("generation {generation}"),
        actual: "reset".to_string(),
    }
}

/// Borrowed session with a generation in flight.
///
/// Dropping it before the generation finishes puts the session back to
/// Idle. After `complete` or `fail` the drop is a no-op.
struct InFlight<'a> {
    session: &'a mut Session,
    generation: u64,
}

impl Deref for InFlight<'_> {
    type Target = Session;

    fn deref(&self) -> &Session {
        self.session
    }
}

impl DerefMut for InFlight<'_> {
    fn deref_mut(&mut self) -> &mut Session {
        self.session
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.session.cancel(self.generation);
    }
}

/// Same as [`InFlight`] for a session behind a lock.
struct SharedInFlight {
    session: SharedSession,
    generation: u64,
}

impl Drop for SharedInFlight {
    fn drop(&mut self) {
        if let Ok(mut session) = self.session.try_lock() {
            session.cancel(self.generation);
            return;
        }
        // Someone holds the lock right now; cancel once they let go.
        let session = self.session.clone();
        let generation = self.generation;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    session.lock().await.cancel(generation);
                });
            }
            Err(_) => warn!(generation, "Dropped generation outside a runtime; session left busy"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{PolicyConfig, TemplatePolicy};
    use crate::session::InteractionState;
    use async_trait::async_trait;
    use coderzz_models::providers::{ChatStream, SimulatedProvider, StreamChunk};

    /// Provider whose stream yields some text then fails
    struct BrokenProvider;

    #[async_trait]
    impl ModelProvider for BrokenProvider {
        fn name(&self) -> &str {
            "broken"
        }

        fn models(&self) -> Vec<ModelInfo> {
            vec![]
        }

        async fn chat_stream(&self, _request: ChatRequest) -> coderzz_models::Result<ChatStream> {
            Ok(Box::pin(tokio_stream::iter(vec![
                Ok(StreamChunk::text("def broken(")),
                Err(coderzz_models::Error::ProviderApi("model crashed".to_string())),
            ])))
        }
    }

    /// Provider that refuses the request outright
    struct OfflineProvider;

    #[async_trait]
    impl ModelProvider for OfflineProvider {
        fn name(&self) -> &str {
            "offline"
        }

        fn models(&self) -> Vec<ModelInfo> {
            vec![]
        }

        async fn chat_stream(&self, _request: ChatRequest) -> coderzz_models::Result<ChatStream> {
            Err(coderzz_models::Error::Request("connection refused".to_string()))
        }
    }

    fn session() -> Session {
        let config = PolicyConfig {
            epsilon: 0.0,
            ..Default::default()
        };
        Session::new("s", TemplatePolicy::with_seed(config, 5).unwrap())
    }

    fn assistant(provider: Arc<dyn ModelProvider>) -> Assistant {
        Assistant::new(provider, GenerationSettings::default())
    }

    #[tokio::test]
    async fn generate_streams_and_awaits_feedback() {
        let assistant = assistant(Arc::new(SimulatedProvider::new()));
        let mut session = session();

        let mut updates = Vec::new();
        let generation = assistant
            .generate(&mut session, "sort a list", QuerySource::Typed, |text| {
                updates.push(text.to_string())
            })
            .await
            .unwrap();

        let expected = SimulatedProvider::render(&generation.prompt.prompt);
        assert_eq!(generation.code, expected);
        assert_eq!(updates.last(), Some(&expected));
        assert!(updates.len() > 1);
        assert!(updates.windows(2).all(|w| w[1].starts_with(&w[0])));
        assert_eq!(
            session.state(),
            &InteractionState::AwaitingFeedback { action: 0 }
        );
        assert_eq!(session.history().len(), 2);
    }

    #[tokio::test]
    async fn feedback_after_generation_updates_values() {
        let assistant = assistant(Arc::new(SimulatedProvider::new()));
        let mut session = session();
        assistant
            .generate(&mut session, "sort a list", QuerySource::Typed, |_| {})
            .await
            .unwrap();

        let outcome = assistant
            .feedback(&mut session, Some(Feedback::Helpful))
            .unwrap();
        assert!(matches!(outcome, FeedbackOutcome::Updated { action: 0, .. }));
        assert!((session.policy().values().as_slice()[0] - 0.1).abs() < 1e-12);
    }

    #[tokio::test]
    async fn regenerate_uses_requested_template() {
        let assistant = assistant(Arc::new(SimulatedProvider::new()));
        let mut session = session();
        assistant
            .generate(&mut session, "sort a list", QuerySource::Speech, |_| {})
            .await
            .unwrap();
        assistant
            .feedback(&mut session, Some(Feedback::NotHelpful))
            .unwrap();

        let generation = assistant
            .regenerate(&mut session, 2, |_| {})
            .await
            .unwrap();
        assert_eq!(generation.prompt.action, 2);
        assert!(generation.prompt.forced);
        assert!(generation.code.contains("detailed comments"));
        assert_eq!(session.last_source(), QuerySource::Speech);
        assert_eq!(session.history().len(), 4);
    }

    #[tokio::test]
    async fn generate_with_action_skips_selection() {
        let assistant = assistant(Arc::new(SimulatedProvider::new()));
        let mut session = session();
        let generation = assistant
            .generate_with_action(&mut session, "sort a list", QuerySource::Typed, 3, |_| {})
            .await
            .unwrap();
        assert_eq!(generation.prompt.action, 3);
        assert!(generation.code.contains("Write optimized"));
        assert_eq!(
            session.state(),
            &InteractionState::AwaitingFeedback { action: 3 }
        );

        let err = assistant
            .generate_with_action(&mut session, "again", QuerySource::Typed, 9, |_| {})
            .await
            .unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[tokio::test]
    async fn regenerate_without_question_is_invalid_state() {
        let assistant = assistant(Arc::new(SimulatedProvider::new()));
        let mut session = session();
        let err = assistant
            .regenerate(&mut session, 1, |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn empty_question_never_reaches_provider() {
        // OfflineProvider would turn any request into a Generation error.
        let assistant = assistant(Arc::new(OfflineProvider));
        let mut session = session();
        let err = assistant
            .generate(&mut session, "  ", QuerySource::Typed, |_| {})
            .await
            .unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[tokio::test]
    async fn stream_failure_preserves_history_and_values() {
        let good = assistant(Arc::new(SimulatedProvider::new()));
        let mut session = session();
        good.generate(&mut session, "first", QuerySource::Typed, |_| {})
            .await
            .unwrap();
        good.feedback(&mut session, Some(Feedback::Helpful)).unwrap();
        let values = session.policy().values().clone();

        let broken = assistant(Arc::new(BrokenProvider));
        let err = broken
            .generate(&mut session, "second", QuerySource::Typed, |_| {})
            .await
            .unwrap_err();

        assert!(matches!(err, SessionError::Generation(ref m) if m.contains("model crashed")));
        assert_eq!(session.state(), &InteractionState::Idle);
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.policy().values(), &values);
    }

    #[tokio::test]
    async fn unreachable_provider_returns_to_idle() {
        let assistant = assistant(Arc::new(OfflineProvider));
        let mut session = session();
        let err = assistant
            .generate(&mut session, "q", QuerySource::Typed, |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Generation(_)));
        assert_eq!(session.state(), &InteractionState::Idle);
    }

    #[tokio::test]
    async fn slow_generation_times_out() {
        let provider = SimulatedProvider::new().with_chunk_delay(Duration::from_millis(200));
        let settings = GenerationSettings {
            timeout: Duration::from_millis(50),
            ..Default::default()
        };
        let assistant = Assistant::new(Arc::new(provider), settings);
        let mut session = session();

        let err = assistant
            .generate(&mut session, "q", QuerySource::Typed, |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Timeout(_)));
        assert_eq!(session.state(), &InteractionState::Idle);
    }

    fn slow_assistant(delay_ms: u64) -> Assistant {
        let provider = SimulatedProvider::new().with_chunk_delay(Duration::from_millis(delay_ms));
        assistant(Arc::new(provider))
    }

    fn shared(session: Session) -> SharedSession {
        Arc::new(tokio::sync::Mutex::new(session))
    }

    #[tokio::test]
    async fn dropped_generation_returns_session_to_idle() {
        let good = assistant(Arc::new(SimulatedProvider::new()));
        let mut session = session();
        good.generate(&mut session, "first", QuerySource::Typed, |_| {})
            .await
            .unwrap();
        good.feedback(&mut session, Some(Feedback::Helpful)).unwrap();
        let values = session.policy().values().clone();

        // The caller gives up long before the provider's own timeout.
        let slow = slow_assistant(200);
        let abandoned = tokio::time::timeout(
            Duration::from_millis(50),
            slow.generate(&mut session, "second", QuerySource::Typed, |_| {}),
        )
        .await;
        assert!(abandoned.is_err());

        assert_eq!(session.state(), &InteractionState::Idle);
        assert_eq!(session.policy().values(), &values);
        assert_eq!(session.history().len(), 2);
        good.generate(&mut session, "third", QuerySource::Typed, |_| {})
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn shared_generation_leaves_session_readable() {
        let slow = slow_assistant(30);
        let shared = shared(session());

        let first = slow.generate_shared(
            &shared,
            |s| s.begin("sort a list", QuerySource::Typed),
            |_| {},
        );
        let observer = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let state = tokio::time::timeout(Duration::from_millis(20), shared.lock())
                .await
                .expect("session lock held while streaming")
                .state()
                .clone();
            let second = slow
                .generate_shared(&shared, |s| s.begin("another", QuerySource::Typed), |_| {})
                .await;
            (state, second)
        };

        let (first, (state, second)) = tokio::join!(first, observer);
        assert_eq!(state, InteractionState::Streaming { action: 0 });
        assert!(matches!(second, Err(SessionError::InvalidState { .. })));

        let generation = first.unwrap();
        assert_eq!(generation.prompt.question, "sort a list");
        let session = shared.lock().await;
        assert_eq!(
            session.state(),
            &InteractionState::AwaitingFeedback { action: 0 }
        );
        assert_eq!(session.last_question(), Some("sort a list"));
    }

    #[tokio::test]
    async fn dropped_shared_generation_returns_session_to_idle() {
        let slow = slow_assistant(200);
        let shared = shared(session());

        let abandoned = tokio::time::timeout(
            Duration::from_millis(50),
            slow.generate_shared(&shared, |s| s.begin("q", QuerySource::Typed), |_| {}),
        )
        .await;
        assert!(abandoned.is_err());

        let mut session = shared.lock().await;
        assert_eq!(session.state(), &InteractionState::Idle);
        assert!(session.begin("again", QuerySource::Typed).is_ok());
    }

    #[tokio::test]
    async fn reset_during_shared_generation_discards_result() {
        let slow = slow_assistant(30);
        let shared = shared(session());

        let first = slow.generate_shared(&shared, |s| s.begin("q", QuerySource::Typed), |_| {});
        let resetter = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            shared.lock().await.reset();
        };

        let (first, ()) = tokio::join!(first, resetter);
        assert!(matches!(first, Err(SessionError::InvalidState { .. })));

        let session = shared.lock().await;
        assert_eq!(session.state(), &InteractionState::Idle);
        assert!(session.history().is_empty());
        assert!(session.generated_code().is_none());
    }

    #[tokio::test]
    async fn regenerate_shared_reuses_last_question() {
        let assistant = assistant(Arc::new(SimulatedProvider::new()));
        let shared = shared(session());
        assistant
            .generate_shared(&shared, |s| s.begin("sort a list", QuerySource::Speech), |_| {})
            .await
            .unwrap();
        shared
            .lock()
            .await
            .apply_feedback(Some(Feedback::NotHelpful))
            .unwrap();

        let generation = assistant
            .generate_shared(&shared, |s| s.begin_again(1), |_| {})
            .await
            .unwrap();
        assert_eq!(generation.prompt.action, 1);
        assert_eq!(generation.prompt.question, "sort a list");
        assert_eq!(shared.lock().await.last_source(), QuerySource::Speech);
    }

    #[test]
    fn request_includes_system_prompt_and_temperature() {
        let settings = GenerationSettings {
            temperature: Some(0.2),
            ..Default::default()
        };
        let assistant = Assistant::new(Arc::new(SimulatedProvider::new()), settings);
        let request = assistant.request_for("Generate Rust code for: hello");

        assert_eq!(request.model, "codellama");
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.temperature, Some(0.2));
        assert_eq!(request.last_user_text(), Some("Generate Rust code for: hello"));
    }
}
