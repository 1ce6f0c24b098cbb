//! The "Optimize" action
//!
//! Checks run before any network traffic: a blank protocol is a warning, a
//! missing API key is a blocking error. Past those, the instruction is
//! rendered with the protocol and handed to the model fallback client, which
//! always produces displayable text.

use std::future::Future;

use serde::Serialize;
use tracing::{info, warn};

use crate::llm::fallback::{CompletionAttempt, FallbackReport, ModelFallbackClient};
use crate::prompt::{self, RenderedPrompt};
use crate::types::{AppError, AppResult};

/// Name offered for the plain-text download of a result
pub const DOWNLOAD_FILE_NAME: &str = "optimized_protocol.txt";

pub const EMPTY_PROTOCOL_WARNING: &str = "Paste a protocol first.";

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OptimizeOutcome {
    Result {
        text: String,
        model: Option<String>,
        attempts: Vec<CompletionAttempt>,
        #[serde(skip_serializing_if = "Option::is_none")]
        prompt_warning: Option<String>,
        download_name: &'static str,
    },
    Warning {
        message: String,
    },
}

impl OptimizeOutcome {
    pub fn text(&self) -> Option<&str> {
        match self {
            OptimizeOutcome::Result { text, .. } => Some(text),
            OptimizeOutcome::Warning { .. } => None,
        }
    }
}

/// Render `template` with `protocol_text` and run the fallback sequence
pub async fn detect_and_optimize<C>(
    client: &ModelFallbackClient,
    protocol_text: &str,
    template: &str,
    max_prompt_chars: usize,
    cancel: C,
) -> (RenderedPrompt, FallbackReport)
where
    C: Future<Output = ()>,
{
    let rendered = prompt::render(template, protocol_text, max_prompt_chars);
    let report = client.run_until(&rendered.text, cancel).await;
    (rendered, report)
}

pub async fn optimize<C>(
    client: Option<&ModelFallbackClient>,
    protocol_text: &str,
    instruction: &str,
    max_prompt_chars: usize,
    cancel: C,
) -> AppResult<OptimizeOutcome>
where
    C: Future<Output = ()>,
{
    if protocol_text.trim().is_empty() {
        warn!("Optimize requested with an empty protocol");
        return Ok(OptimizeOutcome::Warning {
            message: EMPTY_PROTOCOL_WARNING.to_string(),
        });
    }

    let client = client.ok_or(AppError::MissingCredential)?;

    info!(
        protocol_chars = protocol_text.chars().count(),
        candidates = client.policy().models.len(),
        "Optimizing protocol"
    );

    let (rendered, report) =
        detect_and_optimize(client, protocol_text, instruction, max_prompt_chars, cancel).await;

    Ok(OptimizeOutcome::Result {
        prompt_warning: rendered.warning(),
        text: report.text,
        model: report.model,
        attempts: report.attempts,
        download_name: DOWNLOAD_FILE_NAME,
    })
}
