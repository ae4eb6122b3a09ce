//! Service-level REST handlers

use std::sync::Arc;

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Seconds since server started
    pub uptime_seconds: i64,
    pub active_sessions: usize,
    /// Generation backend in use ("ollama", "simulated")
    pub provider: String,
    pub model: String,
}

/// GET /api/health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let active_sessions = state.session_manager.count().await;

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        active_sessions,
        provider: state.assistant.provider_name().to_string(),
        model: state.assistant.settings().model.clone(),
    })
}

/// One selectable prompt template
#[derive(Debug, Serialize, Deserialize)]
pub struct ActionSummary {
    pub index: usize,
    pub label: String,
    pub template: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ActionListResponse {
    pub actions: Vec<ActionSummary>,
    pub epsilon: f64,
}

pub(crate) fn action_summaries(state: &AppState) -> Vec<ActionSummary> {
    state
        .session_manager
        .actions()
        .iter()
        .map(|a| ActionSummary {
            index: a.index(),
            label: a.label().to_string(),
            template: a.template().to_string(),
        })
        .collect()
}

/// GET /api/actions - the configured prompt templates
pub async fn list_actions(State(state): State<Arc<AppState>>) -> Json<ActionListResponse> {
    Json(ActionListResponse {
        actions: action_summaries(&state),
        epsilon: state.session_manager.policy_config().epsilon,
    })
}
