//! Session struct and interaction state machine
//!
//! A session owns one template policy and walks each question through
//! `Idle -> Prompted -> Streaming -> AwaitingFeedback -> Updated | Idle`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::history::{ChatEntry, ChatHistory, RECENT_HISTORY_LEN};
use crate::error::{PolicyError, SessionError};
use crate::feedback::Feedback;
use crate::input::QuerySource;
use crate::policy::TemplatePolicy;

/// Where a session is in the question / answer / feedback cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum InteractionState {
    /// Ready for a question
    Idle,
    /// Template chosen, prompt built, request not yet streaming
    Prompted { action: usize },
    /// Receiving generated text
    Streaming { action: usize },
    /// Answer shown; waiting for the user's verdict
    AwaitingFeedback { action: usize },
    /// Feedback applied to the value table
    Updated { action: usize, reward: f64 },
}

impl InteractionState {
    pub fn name(&self) -> &'static str {
        match self {
            InteractionState::Idle => "Idle",
            InteractionState::Prompted { .. } => "Prompted",
            InteractionState::Streaming { .. } => "Streaming",
            InteractionState::AwaitingFeedback { .. } => "AwaitingFeedback",
            InteractionState::Updated { .. } => "Updated",
        }
    }

    /// True while a generation request is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            InteractionState::Prompted { .. } | InteractionState::Streaming { .. }
        )
    }

    /// The action awaiting feedback, if any.
    pub fn pending_action(&self) -> Option<usize> {
        match self {
            InteractionState::AwaitingFeedback { action } => Some(*action),
            _ => None,
        }
    }
}

/// A prompt ready to send to the model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreparedPrompt {
    pub action: usize,
    pub label: String,
    pub question: String,
    pub prompt: String,
    /// True when the action was requested rather than chosen by the policy
    pub forced: bool,
}

/// Result of applying (or skipping) feedback
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FeedbackOutcome {
    Updated {
        action: usize,
        feedback: Feedback,
        reward: f64,
        value: f64,
        message: String,
    },
    Skipped,
}

/// Serializable view of a session for the API and CLI
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub state: InteractionState,
    pub values: Vec<f64>,
    pub input_buffer: String,
    /// Where the staged input came from
    pub input_source: QuerySource,
    pub last_question: Option<String>,
    pub last_source: QuerySource,
    pub last_prompt: Option<String>,
    pub generated_code: Option<String>,
    /// Most recent entries, newest first
    pub history: Vec<ChatEntry>,
}

pub struct Session {
    id: String,
    created_at: DateTime<Utc>,
    policy: TemplatePolicy,
    state: InteractionState,
    history: ChatHistory,
    input_buffer: String,
    input_source: QuerySource,
    last_question: Option<String>,
    last_source: QuerySource,
    last_prompt: Option<String>,
    generated_code: Option<String>,
    /// Bumped by every prepared prompt and by reset
    generation: u64,
}

impl Session {
    pub fn new(id: impl Into<String>, policy: TemplatePolicy) -> Self {
        Self {
            id: id.into(),
            created_at: Utc::now(),
            policy,
            state: InteractionState::Idle,
            history: ChatHistory::new(),
            input_buffer: String::new(),
            input_source: QuerySource::default(),
            last_question: None,
            last_source: QuerySource::default(),
            last_prompt: None,
            generated_code: None,
            generation: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn policy(&self) -> &TemplatePolicy {
        &self.policy
    }

    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    pub fn input_buffer(&self) -> &str {
        &self.input_buffer
    }

    pub fn input_source(&self) -> QuerySource {
        self.input_source
    }

    /// Identifies the most recent prompt; a generation that started under a
    /// different id has been superseded.
    pub fn generation_id(&self) -> u64 {
        self.generation
    }

    pub fn last_question(&self) -> Option<&str> {
        self.last_question.as_deref()
    }

    pub fn last_source(&self) -> QuerySource {
        self.last_source
    }

    pub fn last_prompt(&self) -> Option<&str> {
        self.last_prompt.as_deref()
    }

    pub fn generated_code(&self) -> Option<&str> {
        self.generated_code.as_deref()
    }

    /// Replace the staged input text (quick action prefix, speech, OCR).
    pub fn stage_input(&mut self, text: impl Into<String>, source: QuerySource) {
        self.input_buffer = text.into();
        self.input_source = source;
    }

    /// Start a new question, letting the policy pick the template.
    pub fn begin(
        &mut self,
        question: &str,
        source: QuerySource,
    ) -> Result<PreparedPrompt, SessionError> {
        self.ensure_can_begin()?;
        require_question(question)?;
        let action = self.policy.select()?;
        self.prepare(question, source, action, false)
    }

    /// Start a new question with an explicit template; no exploration roll.
    pub fn begin_with_action(
        &mut self,
        question: &str,
        source: QuerySource,
        action: usize,
    ) -> Result<PreparedPrompt, SessionError> {
        self.ensure_can_begin()?;
        require_question(question)?;
        self.policy.action(action)?;
        self.prepare(question, source, action, true)
    }

    /// Re-ask the last question with an explicit template.
    pub fn begin_again(&mut self, action: usize) -> Result<PreparedPrompt, SessionError> {
        let Some(question) = self.last_question.clone() else {
            return Err(SessionError::InvalidState {
                expected: "a previous question".to_string(),
                actual: "none".to_string(),
            });
        };
        self.begin_with_action(&question, self.last_source, action)
    }

    fn ensure_can_begin(&mut self) -> Result<(), SessionError> {
        if self.state.is_busy() {
            return Err(SessionError::InvalidState {
                expected: "Idle".to_string(),
                actual: self.state.name().to_string(),
            });
        }
        Ok(())
    }

    fn prepare(
        &mut self,
        question: &str,
        source: QuerySource,
        action: usize,
        forced: bool,
    ) -> Result<PreparedPrompt, SessionError> {
        let prompt = self.policy.prompt_for(action, question)?;
        let label = self.policy.action(action)?.label().to_string();

        if let Some(abandoned) = self.state.pending_action() {
            warn!(
                session_id = %self.id,
                action = abandoned,
                "New question while feedback pending; previous answer left unrated"
            );
        }

        self.state = InteractionState::Prompted { action };
        self.generation += 1;
        self.input_buffer.clear();
        self.input_source = QuerySource::default();
        self.last_question = Some(question.to_string());
        self.last_source = source;
        self.last_prompt = Some(prompt.clone());

        info!(
            session_id = %self.id,
            action,
            label = %label,
            forced,
            source = %source,
            "Prepared prompt"
        );

        Ok(PreparedPrompt {
            action,
            label,
            question: question.to_string(),
            prompt,
            forced,
        })
    }

    /// First chunk arrived.
    pub fn mark_streaming(&mut self) -> Result<(), SessionError> {
        match self.state {
            InteractionState::Prompted { action } => {
                self.state = InteractionState::Streaming { action };
                Ok(())
            }
            InteractionState::Streaming { .. } => Ok(()),
            _ => Err(self.invalid("Prompted")),
        }
    }

    /// Generation finished; record the exchange and wait for feedback.
    pub fn complete(&mut self, code: impl Into<String>) -> Result<(), SessionError> {
        let action = match self.state {
            InteractionState::Prompted { action } | InteractionState::Streaming { action } => {
                action
            }
            _ => return Err(self.invalid("Streaming")),
        };
        let code = code.into();
        let question = self.last_question.clone().unwrap_or_default();
        self.history.record_exchange(&question, &code);
        self.generated_code = Some(code);
        self.state = InteractionState::AwaitingFeedback { action };
        Ok(())
    }

    /// Generation failed; return to Idle, keeping history and values.
    pub fn fail(&mut self, error: &SessionError) {
        if self.state.is_busy() {
            warn!(
                session_id = %self.id,
                state = self.state.name(),
                error = %error,
                "Generation failed"
            );
            self.state = InteractionState::Idle;
        }
    }

    /// The generation `generation` was dropped before it finished.
    ///
    /// Returns to Idle when that generation is still the one in flight;
    /// values and history are untouched.
    pub fn cancel(&mut self, generation: u64) {
        if self.generation == generation && self.state.is_busy() {
            warn!(
                session_id = %self.id,
                state = self.state.name(),
                "Generation dropped before completion"
            );
            self.state = InteractionState::Idle;
        }
    }

    /// Apply the user's verdict on the pending answer.
    ///
    /// `None` closes the episode without touching the value table.
    pub fn apply_feedback(
        &mut self,
        feedback: Option<Feedback>,
    ) -> Result<FeedbackOutcome, SessionError> {
        let Some(action) = self.state.pending_action() else {
            return Err(self.invalid("AwaitingFeedback"));
        };

        let Some(feedback) = feedback else {
            info!(session_id = %self.id, action, "Feedback skipped");
            self.state = InteractionState::Idle;
            return Ok(FeedbackOutcome::Skipped);
        };

        let reward = feedback.reward();
        let value = self.policy.learn(action, reward)?;
        self.state = InteractionState::Updated { action, reward };
        info!(session_id = %self.id, action, %feedback, value, "Feedback applied");

        Ok(FeedbackOutcome::Updated {
            action,
            feedback,
            reward,
            value,
            message: feedback.acknowledgement().to_string(),
        })
    }

    /// Clear history, buffers and learned values; back to Idle.
    pub fn reset(&mut self) {
        self.history.clear();
        self.input_buffer.clear();
        self.input_source = QuerySource::default();
        self.generation += 1;
        self.last_question = None;
        self.last_source = QuerySource::default();
        self.last_prompt = None;
        self.generated_code = None;
        self.policy.reset_values();
        self.state = InteractionState::Idle;
        info!(session_id = %self.id, "Session reset");
    }

    /// The last `n` chat entries, newest first.
    pub fn recent_history(&self, n: usize) -> Vec<&ChatEntry> {
        self.history.recent(n)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id.clone(),
            created_at: self.created_at,
            state: self.state.clone(),
            values: self.policy.values().as_slice().to_vec(),
            input_buffer: self.input_buffer.clone(),
            input_source: self.input_source,
            last_question: self.last_question.clone(),
            last_source: self.last_source,
            last_prompt: self.last_prompt.clone(),
            generated_code: self.generated_code.clone(),
            history: self
                .recent_history(RECENT_HISTORY_LEN)
                .into_iter()
                .cloned()
                .collect(),
        }
    }

    fn invalid(&self, expected: &str) -> SessionError {
        SessionError::InvalidState {
            expected: expected.to_string(),
            actual: self.state.name().to_string(),
        }
    }
}

fn require_question(question: &str) -> Result<(), PolicyError> {
    if question.trim().is_empty() {
        return Err(PolicyError::InvalidInput("question is empty".to_string()));
    }
    Ok(())
}
