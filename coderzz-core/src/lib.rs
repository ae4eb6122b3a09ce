//! coderzz-core - template policy, sessions and generation orchestration
//!
//! A question flows through the crate like this:
//!
//! ```text
//! question ──▶ Session::begin ──▶ TemplatePolicy::select (epsilon-greedy)
//!                                      │
//!                                      ▼
//!                               format_prompt ──▶ ModelProvider::chat_stream
//!                                                        │
//!                 display callback ◀── accumulate ◀──────┘
//!                                      │
//!                                      ▼
//!                        AwaitingFeedback ──▶ Feedback ──▶ update_value
//! ```

pub mod assistant;
pub mod error;
pub mod feedback;
pub mod input;
pub mod policy;
pub mod session;
pub mod stream;

pub use assistant::{Assistant, Generation, GenerationSettings};
pub use error::{InputError, PolicyError, SessionError};
pub use feedback::Feedback;
pub use input::{QuerySource, QuickAction, TesseractOcr};
pub use policy::{Action, ActionSet, PolicyConfig, TemplatePolicy, TemplateSpec, ValueTable};
pub use session::{
    ChatEntry, FeedbackOutcome, InteractionState, PreparedPrompt, Session, SessionManager,
    SessionSnapshot, SharedSession,
};
pub use stream::{StreamAccumulator, StreamOutcome, accumulate};
