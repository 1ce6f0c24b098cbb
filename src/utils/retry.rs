// Retry with exponential backoff

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Extra tries after the first one
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(8),
        }
    }

    /// Single try, no backoff
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Delay before retry number `retry` (1-based): base, 2*base, 4*base, ...
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1).min(16));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2, Duration::from_millis(500))
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// the retry allowance is spent. `on_error` sees every failure with its
/// 0-based try index.
pub async fn with_retry<F, Fut, T, E, R, N>(
    policy: &RetryPolicy,
    operation: F,
    is_retryable: R,
    on_error: N,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    N: FnMut(&E, u32),
{
    retry_loop(policy, None, operation, is_retryable, on_error).await
}

/// Same as [`with_retry`], but never backs off past `deadline`: when the
/// next delay would reach it, the last error is returned instead.
pub async fn with_retry_until<F, Fut, T, E, R, N>(
    policy: &RetryPolicy,
    deadline: Instant,
    operation: F,
    is_retryable: R,
    on_error: N,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    N: FnMut(&E, u32),
{
    retry_loop(policy, Some(deadline), operation, is_retryable, on_error).await
}

async fn retry_loop<F, Fut, T, E, R, N>(
    policy: &RetryPolicy,
    deadline: Option<Instant>,
    mut operation: F,
    is_retryable: R,
    mut on_error: N,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    N: FnMut(&E, u32),
{
    let mut attempt = 0;

    loop {
        match operation(attempt).await {
            Ok(result) => return Ok(result),
            Err(error) => {
                on_error(&error, attempt);
                if attempt >= policy.max_retries || !is_retryable(&error) {
                    return Err(error);
                }

                let delay = policy.delay_for(attempt + 1);
                if let Some(deadline) = deadline {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if delay >= remaining {
                        debug!(?delay, ?remaining, "Backoff would pass the deadline, giving up");
                        return Err(error);
                    }
                }

                attempt += 1;
                sleep(delay).await;
            }
        }
    }
}
