use std::sync::Arc;

use crate::config::Config;
use crate::llm::fallback::{FallbackPolicy, ModelFallbackClient};
use crate::llm::provider::{create_adapter, LLMAdapter};
use crate::protocol::{PlasmidClient, PlasmidRecord};
use crate::session::SessionRegistry;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub sessions: SessionRegistry,
    /// `None` when no API key is configured
    pub completion: Option<Arc<ModelFallbackClient>>,
    pub plasmids: Arc<PlasmidClient>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let completion = config.llm.active_api_key().map(|key| {
            let adapter = create_adapter(&config.llm, key);
            Arc::new(ModelFallbackClient::new(adapter, FallbackPolicy::from_config(&config.llm)))
        });

        Self::with_adapter(config, completion)
    }

    /// Build state around an existing completion client (tests, embedding)
    pub fn with_adapter(config: Config, completion: Option<Arc<ModelFallbackClient>>) -> Self {
        let plasmids = Arc::new(PlasmidClient::with_base_url(&config.scraper.addgene_base_url));
        Self {
            config,
            sessions: SessionRegistry::default(),
            completion,
            plasmids,
        }
    }

    pub fn with_llm_adapter(config: Config, adapter: Arc<dyn LLMAdapter>) -> Self {
        let client = ModelFallbackClient::new(adapter, FallbackPolicy::from_config(&config.llm));
        Self::with_adapter(config, Some(Arc::new(client)))
    }
}

// API Request/Response types

#[derive(Debug, serde::Serialize)]
pub struct SessionCreated {
    pub session_id: uuid::Uuid,
    pub protocol_type: String,
    pub instruction: String,
}

#[derive(Debug, serde::Deserialize)]
pub struct ResetInstructionRequest {
    pub protocol_type: String,
}

#[derive(Debug, serde::Deserialize)]
pub struct SaveTemplateRequest {
    pub name: String,
    pub instruction: String,
}

#[derive(Debug, serde::Deserialize)]
pub struct SavePresetRequest {
    pub name: String,
    pub protocol_type: Option<String>,
    pub instruction: String,
}

#[derive(Debug, serde::Serialize)]
pub struct SavedResponse {
    pub name: String,
    pub message: String,
}

#[derive(Debug, serde::Serialize)]
pub struct NamesResponse {
    pub names: Vec<String>,
}

#[derive(Debug, serde::Deserialize)]
pub struct ProtocolTextRequest {
    pub text: String,
}

#[derive(Debug, serde::Serialize)]
pub struct ProtocolResponse {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
pub struct PlasmidRequest {
    pub plasmid_id: String,
}

#[derive(Debug, serde::Serialize)]
pub struct PlasmidResponse {
    pub plasmid: PlasmidRecord,
    pub protocol: ProtocolResponse,
}

#[derive(Debug, serde::Deserialize)]
pub struct OptimizeRequest {
    /// Overrides (and replaces) the session buffer when present
    pub protocol_text: Option<String>,
    pub instruction: String,
}

#[derive(Debug, serde::Serialize)]
pub struct ProtocolTypesResponse {
    pub protocol_types: Vec<&'static str>,
    pub default_type: &'static str,
}

#[derive(Debug, serde::Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub completion_configured: bool,
    pub active_sessions: usize,
    pub candidate_models: Vec<String>,
}
