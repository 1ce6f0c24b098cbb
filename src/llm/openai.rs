// OpenAI-compatible chat-completions adapter
// Works against api.openai.com and any endpoint speaking the same
// /chat/completions dialect (set OPENAI_API_BASE).

use crate::config::DEFAULT_API_BASE;
use crate::llm::provider::{CompletionError, CompletionResult, LLMAdapter};
use crate::types::{LLMRequest, LLMResponse, TokenUsage};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub struct OpenAIAdapter {
    client: Client,
    api_key: String,
    api_base: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    code: Option<String>,
}

impl OpenAIAdapter {
    pub fn new(api_key: &str) -> Self {
        Self::new_with_api_base(api_key, DEFAULT_API_BASE)
    }

    pub fn new_with_api_base(api_key: &str, api_base: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }
}

#[async_trait]
impl LLMAdapter for OpenAIAdapter {
    async fn create_chat_completion(&self, request: &LLMRequest) -> CompletionResult<LLMResponse> {
        let body = ChatRequest {
            model: &request.model,
            messages: request
                .messages
                .iter()
                .map(|m| ChatMessage {
                    role: &m.role,
                    content: &m.content,
                })
                .collect(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        debug!(model = %request.model, "Sending chat completion request");

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CompletionError::Transport(e.to_string()))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();

            let message = match serde_json::from_str::<ErrorResponse>(&error_text) {
                Ok(parsed) => match parsed.error.code {
                    Some(code) => format!("{} (code: {})", parsed.error.message, code),
                    None => parsed.error.message,
                },
                Err(_) => error_text,
            };

            return Err(CompletionError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::InvalidResponse(e.to_string()))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| CompletionError::InvalidResponse("no choices returned".to_string()))?;

        let usage = parsed
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        Ok(LLMResponse {
            content: choice.message.content.unwrap_or_default(),
            finish_reason: choice.finish_reason.unwrap_or_else(|| "stop".to_string()),
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[test]
    fn test_api_base_trailing_slash() {
        let adapter = OpenAIAdapter::new_with_api_base("key", "http://localhost:8080/v1/");
        assert_eq!(adapter.completions_url(), "http://localhost:8080/v1/chat/completions");

        let default = OpenAIAdapter::new("key");
        assert_eq!(default.completions_url(), "https://api.openai.com/v1/chat/completions");
    }

    #[tokio::test]
    async fn test_successful_completion() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "model": "gpt-4",
                "temperature": 0.2,
                "messages": [{ "role": "user", "content": "Protocol: digest" }]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "choices": [{ "message": { "role": "assistant", "content": "1. Issues" }, "finish_reason": "stop" }],
                    "usage": { "prompt_tokens": 5, "completion_tokens": 2, "total_tokens": 7 }
                }"#,
            )
            .create_async()
            .await;

        let adapter = OpenAIAdapter::new_with_api_base("sk-test", &server.url());
        let request = LLMRequest::single_user("gpt-4", "Protocol: digest", 0.2);
        let response = adapter.create_chat_completion(&request).await.unwrap();

        assert_eq!(response.content, "1. Issues");
        assert_eq!(response.finish_reason, "stop");
        assert_eq!(response.usage.total_tokens, 7);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_body_is_surfaced() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(404)
            .with_header("content-type", "application/json")
            .with_body(r#"{ "error": { "message": "The model `gpt-4` does not exist", "code": "model_not_found" } }"#)
            .create_async()
            .await;

        let adapter = OpenAIAdapter::new_with_api_base("sk-test", &server.url());
        let request = LLMRequest::single_user("gpt-4", "p", 0.2);
        let err = adapter.create_chat_completion(&request).await.unwrap_err();

        assert_eq!(
            err,
            CompletionError::Status {
                status: 404,
                message: "The model `gpt-4` does not exist (code: model_not_found)".to_string(),
            }
        );
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_rate_limit_is_transient() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body("too many requests")
            .create_async()
            .await;

        let adapter = OpenAIAdapter::new_with_api_base("sk-test", &server.url());
        let request = LLMRequest::single_user("gpt-4", "p", 0.2);
        let err = adapter.create_chat_completion(&request).await.unwrap_err();

        assert!(matches!(err, CompletionError::Status { status: 429, .. }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_empty_choices_rejected() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{ "choices": [] }"#)
            .create_async()
            .await;

        let adapter = OpenAIAdapter::new_with_api_base("sk-test", &server.url());
        let request = LLMRequest::single_user("gpt-4", "p", 0.2);
        let err = adapter.create_chat_completion(&request).await.unwrap_err();

        assert!(matches!(err, CompletionError::InvalidResponse(_)));
    }
}
