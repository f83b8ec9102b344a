//! Axum route handlers for compare sessions.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::compare::session::CompareView;
use crate::drawer::Section;
use crate::errors::AppError;
use crate::explain::handlers::default_role;
use crate::models::candidate::Candidate;
use crate::models::filters::FilterSet;
use crate::plan::PlanContext;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub filters: FilterSet,
    #[serde(default)]
    pub plan: PlanContext,
    #[serde(default = "default_role")]
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct SelectRequest {
    pub candidate: Candidate,
}

#[derive(Debug, Deserialize)]
pub struct ToggleSectionRequest {
    pub panel: usize,
    pub section: Section,
}

/// POST /api/v1/compare/sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> (StatusCode, Json<CompareView>) {
    let view = state.sessions.create(req.filters, req.plan, req.role).await;
    (StatusCode::CREATED, Json(view))
}

/// GET /api/v1/compare/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CompareView>, AppError> {
    Ok(Json(state.sessions.view(id).await?))
}

/// POST /api/v1/compare/sessions/:id/select
///
/// Applies one selection click. When a pair is formed the two fetches run in
/// the background; poll the session until both slots settle.
pub async fn handle_select(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SelectRequest>,
) -> Result<Json<CompareView>, AppError> {
    if req.candidate.id.is_empty() {
        return Err(AppError::Validation("candidate.id cannot be empty".to_string()));
    }

    let outcome = state
        .sessions
        .select(id, req.candidate, state.why.clone(), state.sink.clone())
        .await?;
    Ok(Json(outcome.view))
}

/// POST /api/v1/compare/sessions/:id/sections
pub async fn handle_toggle_section(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ToggleSectionRequest>,
) -> Result<Json<CompareView>, AppError> {
    Ok(Json(
        state
            .sessions
            .toggle_section(id, req.panel, req.section)
            .await?,
    ))
}

/// DELETE /api/v1/compare/sessions/:id
pub async fn handle_delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.sessions.remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
