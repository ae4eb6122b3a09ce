//! Shared application state for the coderzz server

use std::sync::Arc;

use chrono::{DateTime, Utc};
use coderzz_core::{Assistant, PolicyConfig, PolicyError, SessionManager, TesseractOcr};

/// Shared application state accessible by all handlers
#[derive(Clone)]
pub struct AppState {
    pub session_manager: Arc<SessionManager>,
    pub assistant: Assistant,
    pub ocr: TesseractOcr,
    /// When the server started
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(session_manager: Arc<SessionManager>, assistant: Assistant) -> Self {
        Self {
            session_manager,
            assistant,
            ocr: TesseractOcr::default(),
            started_at: Utc::now(),
        }
    }

    /// Build state from a policy configuration, validating it.
    pub fn from_config(policy: PolicyConfig, assistant: Assistant) -> Result<Self, PolicyError> {
        let manager = SessionManager::new(policy)?;
        Ok(Self::new(Arc::new(manager), assistant))
    }

    pub fn with_ocr(mut self, ocr: TesseractOcr) -> Self {
        self.ocr = ocr;
        self
    }

    /// Returns how long the server has been running
    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}
