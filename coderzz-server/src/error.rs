//! Server error types

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use coderzz_core::{InputError, PolicyError, SessionError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur in the coderzz server
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to the specified address
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// Request the user can correct (empty question, bad feedback label)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Request not allowed in the session's current state
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Model server or OCR tool failed
    #[error("upstream failure: {0}")]
    Upstream(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON body for error responses
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ServerError::InvalidState(_) => StatusCode::CONFLICT,
            ServerError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ServerError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ServerError::Bind { .. } | ServerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ServerError::SessionNotFound(_) => "NOT_FOUND",
            ServerError::InvalidInput(_) => "INVALID_INPUT",
            ServerError::InvalidState(_) => "INVALID_STATE",
            ServerError::Upstream(_) => "UPSTREAM_FAILURE",
            ServerError::Timeout(_) => "TIMEOUT",
            ServerError::Bind { .. } | ServerError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(error = %self, "Request failed");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
                code: self.code().to_string(),
            }),
        )
            .into_response()
    }
}

impl From<PolicyError> for ServerError {
    fn from(err: PolicyError) -> Self {
        match err {
            PolicyError::InvalidInput(msg) => ServerError::InvalidInput(msg),
            PolicyError::InvalidConfig(msg) => ServerError::Internal(msg),
        }
    }
}

impl From<InputError> for ServerError {
    fn from(err: InputError) -> Self {
        match err {
            InputError::UnsupportedFormat(_) | InputError::InvalidUtf8(_) => {
                ServerError::InvalidInput(err.to_string())
            }
            InputError::Ocr(_) => ServerError::Upstream(err.to_string()),
            InputError::Io(_) => ServerError::Internal(err.to_string()),
        }
    }
}

impl From<SessionError> for ServerError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(id) => ServerError::SessionNotFound(id),
            SessionError::InvalidState { .. } => ServerError::InvalidState(err.to_string()),
            SessionError::Policy(e) => e.into(),
            SessionError::Input(e) => e.into(),
            SessionError::Generation(msg) => ServerError::Upstream(msg),
            SessionError::Timeout(_) => ServerError::Timeout(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn session_errors_map_to_statuses() {
        let cases = [
            (SessionError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (
                SessionError::Policy(PolicyError::InvalidInput("empty".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                SessionError::InvalidState {
                    expected: "AwaitingFeedback".into(),
                    actual: "Idle".into(),
                },
                StatusCode::CONFLICT,
            ),
            (
                SessionError::Generation("refused".into()),
                StatusCode::BAD_GATEWAY,
            ),
            (
                SessionError::Timeout(Duration::from_secs(1)),
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                SessionError::Input(InputError::InvalidUtf8("f".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                SessionError::Input(InputError::Ocr("missing".into())),
                StatusCode::BAD_GATEWAY,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ServerError::from(err).status(), status);
        }
    }

    #[test]
    fn invalid_state_message_is_kept() {
        let err = ServerError::from(SessionError::InvalidState {
            expected: "AwaitingFeedback".into(),
            actual: "Idle".into(),
        });
        assert!(err.to_string().contains("expected AwaitingFeedback"));
        assert_eq!(err.code(), "INVALID_STATE");
    }
}
