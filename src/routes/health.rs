use axum::{extract::State, routing::get, Json, Router};

use crate::catalog::{GENERAL_WET_LAB, PROTOCOL_TYPES};
use crate::models::{AppState, HealthResponse, ProtocolTypesResponse};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/protocol-types", get(protocol_types))
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        completion_configured: state.completion.is_some(),
        active_sessions: state.sessions.len().await,
        candidate_models: state.config.llm.models.clone(),
    })
}

async fn protocol_types() -> Json<ProtocolTypesResponse> {
    Json(ProtocolTypesResponse {
        protocol_types: PROTOCOL_TYPES.to_vec(),
        default_type: GENERAL_WET_LAB,
    })
}
