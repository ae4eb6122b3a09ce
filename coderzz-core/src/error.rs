//! Error types for coderzz-core

use std::time::Duration;

use thiserror::Error;

/// Errors from the template policy
///
/// `InvalidConfig` is fatal: a policy that cannot be built must stop startup.
/// `InvalidInput` is recoverable: the caller should re-prompt.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PolicyError {
    #[error("Invalid policy configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Errors while turning an upload or recording into query text
#[derive(Error, Debug)]
pub enum InputError {
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Document is not valid UTF-8 text: {0}")]
    InvalidUtf8(String),

    #[error("OCR failed: {0}")]
    Ocr(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to session management and interactions
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Invalid state: expected {expected}, got {actual}")]
    InvalidState { expected: String, actual: String },

    #[error("Policy error: {0}")]
    Policy(#[from] PolicyError),

    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Generation timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

impl SessionError {
    /// Whether the user can fix this by changing what they typed.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            SessionError::Policy(PolicyError::InvalidInput(_)) | SessionError::Input(_)
        )
    }
}

impl From<coderzz_models::Error> for SessionError {
    fn from(err: coderzz_models::Error) -> Self {
        SessionError::Generation(err.to_string())
    }
}
