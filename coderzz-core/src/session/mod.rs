//! Session management

pub mod history;
pub mod manager;
pub mod state;

pub use history::{ChatEntry, ChatHistory, RECENT_HISTORY_LEN, Speaker};
pub use manager::{SessionManager, SharedSession};
pub use state::{FeedbackOutcome, InteractionState, PreparedPrompt, Session, SessionSnapshot};
