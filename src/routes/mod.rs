//! API Routes
//!
//! - `/api/health` - Health check
//! - `/api/protocol-types` - Protocol type catalog
//! - `/api/sessions` - Session lifecycle and instruction resolution
//! - `/api/sessions/{id}/templates`, `/presets` - Saved instructions
//! - `/api/sessions/{id}/protocol` - Protocol buffer, file import, plasmid context
//! - `/api/sessions/{id}/optimize` - Run the model fallback completion
//! - `/` - Single-page UI

pub mod health;
pub mod sessions;
pub mod templates;
pub mod protocol;
pub mod optimize;
pub mod ui;

use axum::http::HeaderValue;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::AppState;
use crate::session::Session;
use crate::types::{AppError, AppResult};

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let cors = cors_layer(&state.config.server.cors_allowed_origins);

    Router::new()
        .merge(health::router())
        .merge(sessions::router())
        .merge(templates::router())
        .merge(protocol::router())
        .merge(optimize::router())
        .merge(ui::router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    base.allow_origin(parsed)
}

pub(crate) async fn read_session<R>(
    state: &AppState,
    id: Uuid,
    f: impl FnOnce(&Session) -> R,
) -> AppResult<R> {
    state
        .sessions
        .read(&id, f)
        .await
        .ok_or_else(|| AppError::NotFound(format!("session {}", id)))
}

pub(crate) async fn update_session<R>(
    state: &AppState,
    id: Uuid,
    f: impl FnOnce(&mut Session) -> R,
) -> AppResult<R> {
    state
        .sessions
        .update(&id, f)
        .await
        .ok_or_else(|| AppError::NotFound(format!("session {}", id)))
}
