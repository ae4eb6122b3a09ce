//! HTTP server module

mod api;
mod sessions;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub use api::{ActionListResponse, ActionSummary, HealthResponse};
pub use sessions::{
    ActionRef, FeedbackRequest, FeedbackResponse, GenerateRequest, GenerateResponse,
    QuickActionRequest, SessionListResponse, StageInputRequest, StagedInputResponse,
};

/// Create the HTTP router with all routes configured
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(api::health))
        .route("/api/actions", get(api::list_actions))
        .route(
            "/api/sessions",
            get(sessions::list_sessions).post(sessions::create_session),
        )
        .route(
            "/api/sessions/:id",
            get(sessions::get_session).delete(sessions::delete_session),
        )
        .route("/api/sessions/:id/reset", post(sessions::reset_session))
        .route("/api/sessions/:id/quick-action", post(sessions::quick_action))
        .route("/api/sessions/:id/input", post(sessions::stage_input))
        .route("/api/sessions/:id/upload", post(sessions::upload))
        .route("/api/sessions/:id/generate", post(sessions::generate))
        .route("/api/sessions/:id/regenerate", post(sessions::regenerate))
        .route("/api/sessions/:id/feedback", post(sessions::feedback))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
