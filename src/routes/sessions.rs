use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::info;
use uuid::Uuid;

use super::{read_session, update_session};
use crate::catalog;
use crate::models::{AppState, ResetInstructionRequest, SessionCreated};
use crate::session::{InstructionSelection, ResolvedInstruction};
use crate::types::{AppError, AppResult};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/{id}", delete(end_session))
        .route("/api/sessions/{id}/instruction", get(resolve_instruction))
        .route("/api/sessions/{id}/instruction/reset", post(reset_instruction))
}

async fn create_session(State(state): State<AppState>) -> AppResult<(StatusCode, Json<SessionCreated>)> {
    let session_id = state.sessions.create().await;
    info!(session_id = %session_id, "Session started");

    let resolved = read_session(&state, session_id, |s| {
        s.resolve_instruction(&InstructionSelection::default())
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(SessionCreated {
            session_id,
            protocol_type: resolved.protocol_type,
            instruction: resolved.instruction,
        }),
    ))
}

async fn end_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<StatusCode> {
    if state.sessions.remove(&id).await {
        info!(session_id = %id, "Session ended, state discarded");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("session {}", id)))
    }
}

async fn resolve_instruction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(selection): Query<InstructionSelection>,
) -> AppResult<Json<ResolvedInstruction>> {
    if let Some(protocol_type) = &selection.protocol_type {
        ensure_known_type(protocol_type)?;
    }

    let resolved = read_session(&state, id, |s| s.resolve_instruction(&selection)).await?;
    Ok(Json(resolved))
}

async fn reset_instruction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ResetInstructionRequest>,
) -> AppResult<Json<ResolvedInstruction>> {
    ensure_known_type(&request.protocol_type)?;

    let instruction = update_session(&state, id, |s| {
        s.reset_instruction(&request.protocol_type).to_string()
    })
    .await?;

    Ok(Json(ResolvedInstruction {
        protocol_type: request.protocol_type,
        instruction,
        source: crate::session::InstructionSource::Default,
    }))
}

pub(crate) fn ensure_known_type(protocol_type: &str) -> AppResult<()> {
    if catalog::is_known_type(protocol_type) {
        Ok(())
    } else {
        Err(AppError::InvalidRequest(format!(
            "unknown protocol type {:?}",
            protocol_type
        )))
    }
}
