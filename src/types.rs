// Type definitions and errors

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LLMRequest {
    pub model: String,
    pub messages: Vec<LLMMessage>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl LLMRequest {
    /// A request carrying the whole prompt as a single user-role message
    pub fn single_user(model: impl Into<String>, prompt: impl Into<String>, temperature: f32) -> Self {
        Self {
            model: model.into(),
            messages: vec![LLMMessage::user(prompt)],
            max_tokens: None,
            temperature: Some(temperature),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LLMMessage {
    pub role: String, // "user", "assistant", "system"
    pub content: String,
}

impl LLMMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LLMResponse {
    pub content: String,
    pub finish_reason: String,
    pub usage: TokenUsage,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Missing completion API key (set OPENAI_API_KEY)")]
    MissingCredential,

    #[error("Could not read uploaded file: {0}")]
    FileParse(#[from] crate::protocol::import::ImportError),

    #[error("Plasmid lookup failed: {0}")]
    Plasmid(#[from] crate::protocol::plasmid::PlasmidError),

    #[error("{0}")]
    Store(#[from] crate::store::StoreError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::MissingCredential => "missing_credential",
            AppError::FileParse(_) => "file_parse",
            AppError::Plasmid(_) => "plasmid",
            AppError::Store(_) => "store",
            AppError::NotFound(_) => "not_found",
            AppError::InvalidRequest(_) => "invalid_request",
            AppError::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingCredential => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Store(_)
            | AppError::InvalidRequest(_)
            | AppError::Plasmid(crate::protocol::PlasmidError::InvalidId(_)) => StatusCode::BAD_REQUEST,
            AppError::FileParse(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Plasmid(_) => StatusCode::BAD_GATEWAY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(kind = self.kind(), error = %self, "Request failed");
        } else {
            tracing::warn!(kind = self.kind(), error = %self, "Request rejected");
        }

        let body = Json(serde_json::json!({
            "error": self.to_string(),
            "kind": self.kind(),
        }));
        (status, body).into_response()
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_user_request_shape() {
        let request = LLMRequest::single_user("gpt-4", "Protocol: digest", 0.2);
        assert_eq!(request.model, "gpt-4");
        assert_eq!(request.messages, vec![LLMMessage::user("Protocol: digest")]);
        assert_eq!(request.temperature, Some(0.2));
        assert!(request.max_tokens.is_none());
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(AppError::MissingCredential.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(AppError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::InvalidRequest("x".into()).kind(), "invalid_request");
        assert_eq!(AppError::MissingCredential.kind(), "missing_credential");
    }
}
