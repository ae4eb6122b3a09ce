//! Session REST handlers
//!
//! Handlers lock a session only while reading or changing it. Generations
//! release the lock while the model streams, so snapshots stay available and
//! a second generation on a busy session is refused with 409.

use std::path::Path as FsPath;
use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
};
use coderzz_core::input::{document_text, is_image_path};
use coderzz_core::{
    Feedback, FeedbackOutcome, Generation, QuerySource, QuickAction, SessionSnapshot,
};
use serde::{Deserialize, Serialize};

use super::api::{ActionSummary, action_summaries};
use crate::{AppState, ServerError};

type ApiResult<T> = Result<Json<T>, ServerError>;

#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionSnapshot>,
}

/// POST /api/sessions
pub async fn create_session(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<SessionSnapshot>), ServerError> {
    let id = state.session_manager.create_session().await?;
    let session = state.session_manager.get(&id).await?;
    let snapshot = session.lock().await.snapshot();
    Ok((StatusCode::CREATED, Json(snapshot)))
}

/// GET /api/sessions
pub async fn list_sessions(State(state): State<Arc<AppState>>) -> Json<SessionListResponse> {
    Json(SessionListResponse {
        sessions: state.session_manager.snapshots().await,
    })
}

/// GET /api/sessions/:id
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<SessionSnapshot> {
    let session = state.session_manager.get(&id).await?;
    let snapshot = session.lock().await.snapshot();
    Ok(Json(snapshot))
}

/// DELETE /api/sessions/:id
pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    state.session_manager.remove(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/sessions/:id/reset
pub async fn reset_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<SessionSnapshot> {
    let session = state.session_manager.get(&id).await?;
    let mut session = session.lock().await;
    session.reset();
    Ok(Json(session.snapshot()))
}

/// Text now staged in the session's input buffer
#[derive(Debug, Serialize)]
pub struct StagedInputResponse {
    pub input: String,
    pub source: QuerySource,
}

#[derive(Debug, Deserialize)]
pub struct QuickActionRequest {
    pub language: String,
}

/// POST /api/sessions/:id/quick-action
pub async fn quick_action(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<QuickActionRequest>,
) -> ApiResult<StagedInputResponse> {
    let action: QuickAction = request.language.parse()?;
    let session = state.session_manager.get(&id).await?;
    let mut session = session.lock().await;
    session.stage_input(action.prefix(), QuerySource::Typed);
    Ok(Json(StagedInputResponse {
        input: session.input_buffer().to_string(),
        source: QuerySource::Typed,
    }))
}

#[derive(Debug, Deserialize)]
pub struct StageInputRequest {
    pub text: String,
    #[serde(default)]
    pub source: QuerySource,
}

/// POST /api/sessions/:id/input - stage recognized speech or edited text
pub async fn stage_input(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<StageInputRequest>,
) -> ApiResult<StagedInputResponse> {
    let session = state.session_manager.get(&id).await?;
    let mut session = session.lock().await;
    session.stage_input(request.text, request.source);
    Ok(Json(StagedInputResponse {
        input: session.input_buffer().to_string(),
        source: session.input_source(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub filename: String,
}

/// POST /api/sessions/:id/upload?filename=... - raw body is an image or document
///
/// Images go through OCR; everything else must be UTF-8 text.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> ApiResult<StagedInputResponse> {
    let session = state.session_manager.get(&id).await?;

    let (text, source) = if is_image_path(FsPath::new(&query.filename)) {
        (state.ocr.extract_from_bytes(&body).await?, QuerySource::Image)
    } else {
        (document_text(&query.filename, &body)?, QuerySource::Document)
    };
    tracing::debug!(
        session_id = %id,
        filename = %query.filename,
        %source,
        len = text.len(),
        "Upload converted to text"
    );

    let mut session = session.lock().await;
    session.stage_input(text, source);
    Ok(Json(StagedInputResponse {
        input: session.input_buffer().to_string(),
        source: session.input_source(),
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerateRequest {
    /// Question text; the staged input is used when absent
    pub question: Option<String>,
    /// Defaults to the staged input's source, or typed for an explicit question
    pub source: Option<QuerySource>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    #[serde(flatten)]
    pub generation: Generation,
    pub values: Vec<f64>,
}

/// POST /api/sessions/:id/generate
pub async fn generate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<GenerateRequest>,
) -> ApiResult<GenerateResponse> {
    let session = state.session_manager.get(&id).await?;
    let generation = state
        .assistant
        .generate_shared(
            &session,
            |session| {
                let (question, source) = match request.question {
                    Some(question) => (question, request.source.unwrap_or_default()),
                    None => (
                        session.input_buffer().to_string(),
                        request.source.unwrap_or(session.input_source()),
                    ),
                };
                session.begin(&question, source)
            },
            |_| {},
        )
        .await?;

    let values = session.lock().await.policy().values().as_slice().to_vec();
    Ok(Json(GenerateResponse { generation, values }))
}

/// Action chosen by index or by label
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ActionRef {
    Index(usize),
    Label(String),
}

#[derive(Debug, Deserialize)]
pub struct RegenerateRequest {
    pub action: ActionRef,
}

/// POST /api/sessions/:id/regenerate - re-ask with a chosen template
pub async fn regenerate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<RegenerateRequest>,
) -> ApiResult<GenerateResponse> {
    let index = match request.action {
        ActionRef::Index(index) => index,
        ActionRef::Label(label) => state
            .session_manager
            .actions()
            .find_by_label(&label)
            .map(|a| a.index())
            .ok_or_else(|| ServerError::InvalidInput(format!("unknown code type '{label}'")))?,
    };

    let session = state.session_manager.get(&id).await?;
    let generation = state
        .assistant
        .generate_shared(&session, |session| session.begin_again(index), |_| {})
        .await?;

    let values = session.lock().await.policy().values().as_slice().to_vec();
    Ok(Json(GenerateResponse { generation, values }))
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub feedback: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    #[serde(flatten)]
    pub outcome: FeedbackOutcome,
    pub values: Vec<f64>,
    /// Code types to offer after negative feedback
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<ActionSummary>,
}

/// POST /api/sessions/:id/feedback
pub async fn feedback(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<FeedbackRequest>,
) -> ApiResult<FeedbackResponse> {
    let feedback = match request.feedback.as_deref() {
        Some(label) => Feedback::parse(label)?,
        None => None,
    };

    let session = state.session_manager.get(&id).await?;
    let mut session = session.lock().await;
    let outcome = state.assistant.feedback(&mut session, feedback)?;

    let choices = if feedback == Some(Feedback::NotHelpful) {
        action_summaries(&state)
    } else {
        Vec::new()
    };

    Ok(Json(FeedbackResponse {
        outcome,
        values: session.policy().values().as_slice().to_vec(),
        choices,
    }))
}
