// LabMate - AI copilot for wet lab protocols

pub mod config;
pub mod types;
pub mod llm;
pub mod prompt;
pub mod catalog;
pub mod store;
pub mod protocol;
pub mod session;
pub mod optimize;
pub mod models;
pub mod routes;
pub mod utils;
pub mod cli;

// Re-exports for convenience
pub use config::Config;
pub use models::AppState;
pub use optimize::detect_and_optimize;

pub fn create_router(state: AppState) -> axum::Router {
    routes::create_router(state)
}
