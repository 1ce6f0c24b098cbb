use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::LLMConfig;
use crate::types::{LLMRequest, LLMResponse};

/// Failure of a single completion attempt against one model
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompletionError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("API error ({status}): {message}")]
    Status { status: u16, message: String },

    #[error("attempt timed out after {0:?}")]
    Timeout(Duration),

    #[error("malformed response: {0}")]
    InvalidResponse(String),

    #[error("request budget of {0:?} exhausted")]
    BudgetExhausted(Duration),

    #[error("request cancelled")]
    Cancelled,
}

impl CompletionError {
    /// Rate limits, server errors, timeouts and connection failures may
    /// succeed on a second try; auth, bad model ids and malformed bodies won't.
    pub fn is_transient(&self) -> bool {
        match self {
            CompletionError::Transport(_) | CompletionError::Timeout(_) => true,
            CompletionError::Status { status, .. } => *status == 429 || *status >= 500,
            CompletionError::InvalidResponse(_)
            | CompletionError::BudgetExhausted(_)
            | CompletionError::Cancelled => false,
        }
    }
}

pub type CompletionResult<T> = std::result::Result<T, CompletionError>;

#[async_trait]
pub trait LLMAdapter: Send + Sync {
    async fn create_chat_completion(&self, request: &LLMRequest) -> CompletionResult<LLMResponse>;
}

/// Build the completion adapter for a configured key
pub fn create_adapter(config: &LLMConfig, api_key: &str) -> Arc<dyn LLMAdapter> {
    Arc::new(crate::llm::openai::OpenAIAdapter::new_with_api_base(
        api_key,
        &config.api_base,
    ))
}
