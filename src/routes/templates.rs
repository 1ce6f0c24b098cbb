use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::info;
use uuid::Uuid;

use super::sessions::ensure_known_type;
use super::{read_session, update_session};
use crate::models::{AppState, NamesResponse, SavePresetRequest, SaveTemplateRequest, SavedResponse};
use crate::store::Preset;
use crate::types::{AppError, AppResult};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/sessions/{id}/templates", get(list_templates).post(save_template))
        .route(
            "/api/sessions/{id}/templates/{name}",
            get(load_template).delete(delete_template),
        )
        .route("/api/sessions/{id}/presets", get(list_presets).post(save_preset))
        .route(
            "/api/sessions/{id}/presets/{name}",
            get(load_preset).delete(delete_preset),
        )
}

async fn list_templates(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Json<NamesResponse>> {
    let names = read_session(&state, id, |s| s.store.templates.list()).await?;
    Ok(Json(NamesResponse { names }))
}

async fn save_template(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SaveTemplateRequest>,
) -> AppResult<Json<SavedResponse>> {
    let name = update_session(&state, id, |s| s.save_template(&request.name, &request.instruction)).await??;
    info!(session_id = %id, name = %name, "Saved instruction template");

    Ok(Json(SavedResponse {
        message: format!("Saved instruction template '{}'", name),
        name,
    }))
}

async fn load_template(
    State(state): State<AppState>,
    Path((id, name)): Path<(Uuid, String)>,
) -> AppResult<Json<serde_json::Value>> {
    let instruction = read_session(&state, id, |s| s.store.templates.load(&name))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("instruction template '{}'", name)))?;

    Ok(Json(serde_json::json!({ "name": name, "instruction": instruction })))
}

async fn delete_template(
    State(state): State<AppState>,
    Path((id, name)): Path<(Uuid, String)>,
) -> AppResult<StatusCode> {
    let removed = update_session(&state, id, |s| s.store.templates.delete(&name)).await?;
    if removed {
        info!(session_id = %id, name = %name, "Deleted instruction template");
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn list_presets(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Json<NamesResponse>> {
    let names = read_session(&state, id, |s| s.store.presets.list()).await?;
    Ok(Json(NamesResponse { names }))
}

async fn save_preset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SavePresetRequest>,
) -> AppResult<Json<SavedResponse>> {
    if let Some(protocol_type) = &request.protocol_type {
        ensure_known_type(protocol_type)?;
    }

    let name = update_session(&state, id, |s| {
        if let Some(protocol_type) = &request.protocol_type {
            s.select_protocol_type(protocol_type);
        }
        s.save_preset(&request.name, &request.instruction)
    })
    .await??;
    info!(session_id = %id, name = %name, "Saved full preset");

    Ok(Json(SavedResponse {
        message: format!("Saved full preset '{}'", name),
        name,
    }))
}

async fn load_preset(
    State(state): State<AppState>,
    Path((id, name)): Path<(Uuid, String)>,
) -> AppResult<Json<Preset>> {
    let preset = read_session(&state, id, |s| s.store.presets.load(&name))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("preset '{}'", name)))?;

    Ok(Json(preset))
}

async fn delete_preset(
    State(state): State<AppState>,
    Path((id, name)): Path<(Uuid, String)>,
) -> AppResult<StatusCode> {
    let removed = update_session(&state, id, |s| s.store.presets.delete(&name)).await?;
    if removed {
        info!(session_id = %id, name = %name, "Deleted full preset");
    }
    Ok(StatusCode::NO_CONTENT)
}
