use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    routing::{get, post},
    Json, Router,
};
use tracing::info;
use uuid::Uuid;

use super::{read_session, update_session};
use crate::models::{AppState, PlasmidRequest, PlasmidResponse, ProtocolResponse, ProtocolTextRequest};
use crate::protocol::{extract_text, ProtocolBuffer};
use crate::types::{AppError, AppResult};

const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/sessions/{id}/protocol", get(get_protocol).put(set_protocol))
        .route(
            "/api/sessions/{id}/protocol/import",
            post(import_protocol).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/sessions/{id}/protocol/plasmid", post(append_plasmid))
}

fn snapshot(buffer: &ProtocolBuffer) -> ProtocolResponse {
    ProtocolResponse {
        text: buffer.text().to_string(),
        source_file: buffer.source_file().map(str::to_string),
    }
}

async fn get_protocol(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Json<ProtocolResponse>> {
    let response = read_session(&state, id, |s| snapshot(&s.protocol)).await?;
    Ok(Json(response))
}

async fn set_protocol(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ProtocolTextRequest>,
) -> AppResult<Json<ProtocolResponse>> {
    let response = update_session(&state, id, |s| {
        s.protocol.set_text(request.text);
        snapshot(&s.protocol)
    })
    .await?;
    Ok(Json(response))
}

/// Multipart upload with a single `file` field
async fn import_protocol(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> AppResult<Json<ProtocolResponse>> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::InvalidRequest("file field has no filename".to_string()))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidRequest(e.to_string()))?;
        upload = Some((filename, bytes));
        break;
    }

    let (filename, bytes) =
        upload.ok_or_else(|| AppError::InvalidRequest("missing multipart field 'file'".to_string()))?;

    info!(session_id = %id, filename = %filename, size = bytes.len(), "Protocol file uploaded");

    // PDF parsing is CPU-bound
    let name = filename.clone();
    let text = tokio::task::spawn_blocking(move || extract_text(&name, &bytes))
        .await
        .map_err(|e| AppError::Internal(format!("import task failed: {}", e)))??;

    let response = update_session(&state, id, |s| {
        s.protocol.set_imported(&filename, text);
        snapshot(&s.protocol)
    })
    .await?;

    Ok(Json(response))
}

async fn append_plasmid(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<PlasmidRequest>,
) -> AppResult<Json<PlasmidResponse>> {
    // Fail fast on unknown sessions before going to the network
    read_session(&state, id, |_| ()).await?;

    let record = state.plasmids.fetch(&request.plasmid_id).await?;
    info!(
        session_id = %id,
        plasmid = %record.name,
        features = record.features.len(),
        "Appending plasmid context"
    );

    let protocol = update_session(&state, id, |s| {
        s.protocol.append_plasmid_context(&record);
        snapshot(&s.protocol)
    })
    .await?;

    Ok(Json(PlasmidResponse {
        plasmid: record,
        protocol,
    }))
}
