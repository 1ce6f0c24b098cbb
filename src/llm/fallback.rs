//! Model Fallback Client
//!
//! Tries an ordered list of candidate models against one completion
//! transport and returns the first success, annotated with the model that
//! answered. When every candidate fails the caller still gets displayable
//! text: a canned example analysis prefixed with the last error.
//!
//! ## Attempt policy
//!
//! - Candidates are tried strictly in order, one at a time.
//! - Each try is bounded by `attempt_timeout` and by whatever is left of
//!   `request_budget`, a wall-clock ceiling over the whole sequence.
//! - Transient failures (rate limit, 5xx, timeout, connection) are retried
//!   on the same candidate with exponential backoff, up to `retry.max_retries`.
//!   Terminal failures move straight on to the next candidate.
//! - The first success ends the sequence; later candidates are never called.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::{timeout, Instant};
use tracing::{info, warn};

use crate::config::LLMConfig;
use crate::llm::provider::{CompletionError, CompletionResult, LLMAdapter};
use crate::types::LLMRequest;
use crate::utils::retry::{with_retry_until, RetryPolicy};

/// Provenance marker placed in front of every successful answer
pub const USED_MODEL_LABEL: &str = "**Used model:**";

pub const FALLBACK_EXAMPLE: &str = "**Fallback example:**\n\
- Issues: unclear volumes or missing prep steps.\n\
- Parallelization: do setup while waiting for incubation.\n\
- Optimized Protocol: combine reagent prep with equipment warm-up.\n\
- Checklist: [ ] Ready, [ ] Started, [ ] Monitored.";

#[derive(Debug, Clone)]
pub struct FallbackPolicy {
    pub models: Vec<String>,
    pub temperature: f32,
    pub attempt_timeout: Duration,
    pub retry: RetryPolicy,
    pub request_budget: Duration,
    pub fallback_text: String,
}

impl FallbackPolicy {
    pub fn new<I, S>(models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            models: models.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn from_config(config: &LLMConfig) -> Self {
        Self {
            models: config.models.clone(),
            temperature: config.temperature,
            attempt_timeout: config.attempt_timeout(),
            retry: RetryPolicy::new(config.max_retries, config.retry_base_delay()),
            request_budget: config.request_budget(),
            fallback_text: FALLBACK_EXAMPLE.to_string(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_attempt_timeout(mut self, attempt_timeout: Duration) -> Self {
        self.attempt_timeout = attempt_timeout;
        self
    }

    pub fn with_request_budget(mut self, request_budget: Duration) -> Self {
        self.request_budget = request_budget;
        self
    }
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self::from_config(&LLMConfig::default())
    }
}

/// What a single try against one model produced
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    Failure { reason: String, transient: bool },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionAttempt {
    pub model: String,
    /// 1-based try number for this model
    pub try_number: u32,
    #[serde(flatten)]
    pub outcome: AttemptOutcome,
}

impl CompletionAttempt {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Success)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FallbackReport {
    /// Model that answered, `None` when the fallback document was returned
    pub model: Option<String>,
    /// Displayable result: provenance line + answer, or the fallback document
    pub text: String,
    pub attempts: Vec<CompletionAttempt>,
    pub last_error: Option<String>,
    pub cancelled: bool,
}

impl FallbackReport {
    pub fn succeeded(&self) -> bool {
        self.model.is_some()
    }

    /// The ordered list of models that were called, one entry per try
    pub fn attempted_models(&self) -> Vec<&str> {
        self.attempts.iter().map(|a| a.model.as_str()).collect()
    }
}

pub fn format_success(model: &str, content: &str) -> String {
    format!("{} {}\n\n{}", USED_MODEL_LABEL, model, content)
}

pub fn format_failure(last_error: &str, fallback_text: &str) -> String {
    format!(
        "All model attempts failed. Last error: {}\n\n{}",
        last_error, fallback_text
    )
}

pub struct ModelFallbackClient {
    adapter: Arc<dyn LLMAdapter>,
    policy: FallbackPolicy,
}

impl ModelFallbackClient {
    pub fn new(adapter: Arc<dyn LLMAdapter>, policy: FallbackPolicy) -> Self {
        Self { adapter, policy }
    }

    pub fn policy(&self) -> &FallbackPolicy {
        &self.policy
    }

    /// Run the fallback sequence for an already-rendered prompt
    pub async fn run(&self, prompt: &str) -> FallbackReport {
        self.run_until(prompt, std::future::pending::<()>()).await
    }

    /// Like [`run`](Self::run), but abandons the sequence as soon as `cancel`
    /// resolves. The in-flight request is dropped and no further candidate
    /// is tried.
    pub async fn run_until<C>(&self, prompt: &str, cancel: C) -> FallbackReport
    where
        C: Future<Output = ()>,
    {
        let mut attempts = Vec::new();
        tokio::pin!(cancel);

        let outcome = tokio::select! {
            biased;
            _ = &mut cancel => Err(CompletionError::Cancelled),
            result = self.run_sequence(prompt, &mut attempts) => result,
        };

        match outcome {
            Ok((model, content)) => {
                info!(model = %model, tries = attempts.len(), "Completion succeeded");
                FallbackReport {
                    text: format_success(&model, &content),
                    model: Some(model),
                    attempts,
                    last_error: None,
                    cancelled: false,
                }
            }
            Err(error) => {
                let cancelled = error == CompletionError::Cancelled;
                warn!(
                    error = %error,
                    tries = attempts.len(),
                    cancelled,
                    "All model attempts failed, returning fallback text"
                );
                let last_error = error.to_string();
                FallbackReport {
                    text: format_failure(&last_error, &self.policy.fallback_text),
                    model: None,
                    attempts,
                    last_error: Some(last_error),
                    cancelled,
                }
            }
        }
    }

    async fn run_sequence(
        &self,
        prompt: &str,
        attempts: &mut Vec<CompletionAttempt>,
    ) -> CompletionResult<(String, String)> {
        let deadline = Instant::now() + self.policy.request_budget;
        let mut last_error = None;

        for model in &self.policy.models {
            if deadline.saturating_duration_since(Instant::now()).is_zero() {
                warn!(model = %model, "Request budget exhausted before trying candidate");
                last_error = Some(CompletionError::BudgetExhausted(self.policy.request_budget));
                break;
            }

            let request = LLMRequest::single_user(model.as_str(), prompt, self.policy.temperature);
            let request = &request;

            let result = with_retry_until(
                &self.policy.retry,
                deadline,
                move |_| self.attempt(request, deadline),
                CompletionError::is_transient,
                |error, try_index| {
                    warn!(
                        model = %model,
                        attempt = try_index + 1,
                        transient = error.is_transient(),
                        error = %error,
                        "Completion attempt failed"
                    );
                    attempts.push(CompletionAttempt {
                        model: model.clone(),
                        try_number: try_index + 1,
                        outcome: AttemptOutcome::Failure {
                            reason: error.to_string(),
                            transient: error.is_transient(),
                        },
                    });
                },
            )
            .await;

            match result {
                Ok(content) => {
                    let previous_tries = attempts.iter().filter(|a| &a.model == model).count();
                    attempts.push(CompletionAttempt {
                        model: model.clone(),
                        try_number: previous_tries as u32 + 1,
                        outcome: AttemptOutcome::Success,
                    });
                    return Ok((model.clone(), content));
                }
                Err(error) => last_error = Some(error),
            }
        }

        Err(last_error.unwrap_or_else(|| {
            CompletionError::InvalidResponse("no candidate models configured".to_string())
        }))
    }

    async fn attempt(&self, request: &LLMRequest, deadline: Instant) -> CompletionResult<String> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(CompletionError::BudgetExhausted(self.policy.request_budget));
        }

        let limit = self.policy.attempt_timeout.min(remaining);
        match timeout(limit, self.adapter.create_chat_completion(request)).await {
            Ok(Ok(response)) => Ok(response.content),
            Ok(Err(error)) => Err(error),
            Err(_) => Err(CompletionError::Timeout(limit)),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{not_found, ScriptedAdapter, Step};
    use super::*;

    const MODELS: [&str; 3] = ["m1", "m2", "m3"];

    fn client(adapter: Arc<ScriptedAdapter>, policy: FallbackPolicy) -> ModelFallbackClient {
        ModelFallbackClient::new(adapter, policy)
    }

    #[tokio::test]
    async fn test_first_success_wins() {
        let adapter = Arc::new(
            ScriptedAdapter::new()
                .then("m1", Step::Reply("answer from m1"))
                .then("m2", Step::Reply("answer from m2")),
        );
        let report = client(adapter.clone(), FallbackPolicy::new(MODELS)).run("prompt").await;

        assert_eq!(report.model.as_deref(), Some("m1"));
        assert_eq!(report.text, "**Used model:** m1\n\nanswer from m1");
        assert_eq!(adapter.called_models(), vec!["m1"]);
    }

    #[tokio::test]
    async fn test_falls_through_to_third_candidate_in_order() {
        let adapter = Arc::new(
            ScriptedAdapter::new()
                .then("m1", Step::Fail(not_found("m1")))
                .then("m2", Step::Fail(not_found("m2")))
                .then("m3", Step::Reply("cheap answer")),
        );
        let report = client(adapter.clone(), FallbackPolicy::new(MODELS)).run("prompt").await;

        assert_eq!(report.model.as_deref(), Some("m3"));
        assert!(report.text.starts_with("**Used model:** m3"));
        assert_eq!(adapter.called_models(), vec!["m1", "m2", "m3"]);
        assert_eq!(report.attempted_models(), vec!["m1", "m2", "m3"]);
        assert!(report.attempts[2].succeeded());
    }

    #[tokio::test]
    async fn test_all_fail_reports_last_error() {
        let adapter = Arc::new(
            ScriptedAdapter::new()
                .then("m1", Step::Fail(CompletionError::Status { status: 401, message: "first".into() }))
                .then("m2", Step::Fail(CompletionError::Status { status: 403, message: "second".into() }))
                .then("m3", Step::Fail(CompletionError::Status { status: 404, message: "third".into() })),
        );
        let report = client(adapter, FallbackPolicy::new(MODELS)).run("prompt").await;

        assert!(!report.succeeded());
        assert_eq!(
            report.text,
            format!("All model attempts failed. Last error: API error (404): third\n\n{}", FALLBACK_EXAMPLE)
        );
        assert!(!report.text.contains("first"));
        assert_eq!(report.last_error.as_deref(), Some("API error (404): third"));
    }

    #[tokio::test]
    async fn test_request_shape() {
        let adapter = Arc::new(ScriptedAdapter::new().then("m1", Step::Reply("ok")));
        client(adapter.clone(), FallbackPolicy::new(MODELS)).run("Protocol:\nStep 1").await;

        let calls = adapter.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].messages.len(), 1);
        assert_eq!(calls[0].messages[0].role, "user");
        assert_eq!(calls[0].messages[0].content, "Protocol:\nStep 1");
        assert_eq!(calls[0].temperature, Some(0.2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_error_retried_on_same_candidate() {
        let adapter = Arc::new(
            ScriptedAdapter::new()
                .then("m1", Step::Fail(CompletionError::Status { status: 429, message: "rate limited".into() }))
                .then("m1", Step::Reply("second try")),
        );
        let policy = FallbackPolicy::new(MODELS).with_retry(RetryPolicy::new(2, Duration::from_millis(200)));
        let report = client(adapter.clone(), policy).run("prompt").await;

        assert_eq!(report.model.as_deref(), Some("m1"));
        assert_eq!(adapter.called_models(), vec!["m1", "m1"]);
        assert_eq!(report.attempts[1].try_number, 2);
    }

    #[tokio::test]
    async fn test_terminal_error_not_retried() {
        let adapter = Arc::new(
            ScriptedAdapter::new()
                .then("m1", Step::Fail(not_found("m1")))
                .then("m2", Step::Reply("ok")),
        );
        let policy = FallbackPolicy::new(MODELS).with_retry(RetryPolicy::new(3, Duration::from_millis(1)));
        client(adapter.clone(), policy).run("prompt").await;

        assert_eq!(adapter.called_models(), vec!["m1", "m2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_attempt_times_out_and_advances() {
        let adapter = Arc::new(
            ScriptedAdapter::new()
                .then("m1", Step::Hang)
                .then("m2", Step::Reply("after timeout")),
        );
        let policy = FallbackPolicy::new(MODELS)
            .with_retry(RetryPolicy::none())
            .with_attempt_timeout(Duration::from_secs(5));
        let report = client(adapter, policy).run("prompt").await;

        assert_eq!(report.model.as_deref(), Some("m2"));
        assert_eq!(
            report.attempts[0].outcome,
            AttemptOutcome::Failure {
                reason: "attempt timed out after 5s".to_string(),
                transient: true,
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_budget_caps_whole_sequence() {
        let adapter = Arc::new(
            ScriptedAdapter::new()
                .then("m1", Step::Hang)
                .then("m2", Step::Hang)
                .then("m3", Step::Reply("never reached")),
        );
        let policy = FallbackPolicy::new(MODELS)
            .with_retry(RetryPolicy::none())
            .with_attempt_timeout(Duration::from_secs(30))
            .with_request_budget(Duration::from_secs(40));
        let report = client(adapter.clone(), policy).run("prompt").await;

        assert!(!report.succeeded());
        assert_eq!(adapter.called_models(), vec!["m1", "m2"]);
        assert!(report.last_error.unwrap().contains("budget"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_stays_within_request_budget() {
        let adapter = Arc::new(
            ScriptedAdapter::new()
                .then("m1", Step::Fail(CompletionError::Status { status: 503, message: "overloaded".into() }))
                .then("m1", Step::Reply("would answer after backoff")),
        );
        let policy = FallbackPolicy::new(["m1"])
            .with_retry(RetryPolicy::new(1, Duration::from_secs(8)))
            .with_request_budget(Duration::from_secs(1));
        let start = Instant::now();
        let report = client(adapter.clone(), policy).run("prompt").await;

        assert!(start.elapsed() <= Duration::from_secs(1));
        assert!(!report.succeeded());
        assert_eq!(adapter.called_models(), vec!["m1"]);
        assert_eq!(report.last_error.as_deref(), Some("API error (503): overloaded"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_stops_sequence() {
        let adapter = Arc::new(
            ScriptedAdapter::new()
                .then("m1", Step::Hang)
                .then("m2", Step::Reply("too late")),
        );
        let policy = FallbackPolicy::new(MODELS).with_attempt_timeout(Duration::from_secs(60));
        let cancel = tokio::time::sleep(Duration::from_secs(1));
        let report = client(adapter.clone(), policy).run_until("prompt", cancel).await;

        assert!(report.cancelled);
        assert!(!report.succeeded());
        assert_eq!(adapter.called_models(), vec!["m1"]);
        assert!(report.text.contains("request cancelled"));
    }

    #[tokio::test]
    async fn test_empty_candidate_list() {
        let adapter = Arc::new(ScriptedAdapter::new());
        let report = client(adapter.clone(), FallbackPolicy::new(Vec::<String>::new())).run("prompt").await;

        assert!(!report.succeeded());
        assert!(adapter.calls().is_empty());
        assert!(report.text.contains(FALLBACK_EXAMPLE));
    }
}
