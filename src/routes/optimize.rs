use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tracing::info;
use uuid::Uuid;

use super::{read_session, update_session};
use crate::models::{AppState, OptimizeRequest};
use crate::optimize::{optimize, OptimizeOutcome, DOWNLOAD_FILE_NAME};
use crate::types::{AppError, AppResult};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/sessions/{id}/optimize", post(run_optimize))
        .route("/api/sessions/{id}/result/download", get(download_result))
}

/// Dropping this future (client disconnect) abandons the fallback sequence.
async fn run_optimize(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<OptimizeRequest>,
) -> AppResult<Json<OptimizeOutcome>> {
    let protocol_text = update_session(&state, id, |s| {
        if let Some(text) = &request.protocol_text {
            s.protocol.set_text(text.clone());
        }
        s.current_instruction = Some(request.instruction.clone());
        s.protocol.text().to_string()
    })
    .await?;

    let outcome = optimize(
        state.completion.as_deref(),
        &protocol_text,
        &request.instruction,
        state.config.prompt.max_prompt_chars,
        std::future::pending(),
    )
    .await?;

    if let OptimizeOutcome::Result { text, model, .. } = &outcome {
        info!(session_id = %id, model = ?model, "Optimization finished");
        let text = text.clone();
        update_session(&state, id, |s| s.last_result = Some(text)).await?;
    }

    Ok(Json(outcome))
}

async fn download_result(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<impl IntoResponse> {
    let text = read_session(&state, id, |s| s.last_result.clone())
        .await?
        .ok_or_else(|| AppError::NotFound("no result to download yet".to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", DOWNLOAD_FILE_NAME),
            ),
        ],
        text,
    ))
}
