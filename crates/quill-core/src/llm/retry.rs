//! Retry-with-backoff wrapper for outbound LLM calls.
//!
//! Only overload-classified failures are retried; anything else is
//! rethrown immediately. The wrapper is agnostic to what the call does --
//! callers must ensure the closure is safe to invoke more than once.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use super::LlmError;

/// Backoff parameters for [`call_with_retry`].
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum retry attempts after the initial call.
    pub max_retries: u32,
    /// Delay before the first retry; doubles after each retry.
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(2),
        }
    }
}

/// Invoke `call`, retrying overload failures with exponential backoff.
///
/// Each sleep is `delay * (1 + jitter)` with jitter drawn uniformly from
/// `[0, 0.5)`; the base delay doubles after every retry. Once the attempt
/// counter exceeds `max_retries` the last error is rethrown.
pub async fn call_with_retry<T, F, Fut>(policy: &RetryPolicy, mut call: F) -> Result<T, LlmError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let mut delay = policy.initial_delay;
    let mut attempts: u32 = 0;

    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_overload() => {
                attempts += 1;
                if attempts > policy.max_retries {
                    tracing::warn!(
                        attempts = attempts,
                        "retry budget exhausted, giving up on overloaded provider"
                    );
                    return Err(err);
                }
                let jitter: f64 = rand::rng().random_range(0.0..0.5);
                let sleep_for = delay.mul_f64(1.0 + jitter);
                tracing::info!(
                    attempt = attempts,
                    sleep_ms = sleep_for.as_millis() as u64,
                    "provider overloaded, backing off"
                );
                tokio::time::sleep(sleep_for).await;
                delay *= 2;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use super::*;

    fn overload() -> LlmError {
        LlmError::Overloaded {
            message: "overloaded_error".to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn three_overloads_then_success() {
        let policy = RetryPolicy {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
        };
        let calls = Cell::new(0u32);
        let call_times = RefCell::new(Vec::new());

        let result = call_with_retry(&policy, || {
            calls.set(calls.get() + 1);
            call_times.borrow_mut().push(tokio::time::Instant::now());
            let n = calls.get();
            async move {
                if n <= 3 {
                    Err(overload())
                } else {
                    Ok("done")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.get(), 4, "expected the 4th attempt to succeed");

        // Three sleeps with strictly increasing durations within jitter
        // bounds: [100, 150), [200, 300), [400, 600) ms.
        let times = call_times.borrow();
        let gaps: Vec<Duration> = times.windows(2).map(|w| w[1] - w[0]).collect();
        assert_eq!(gaps.len(), 3);
        let bounds = [(100u64, 150u64), (200, 300), (400, 600)];
        for (gap, (lo, hi)) in gaps.iter().zip(bounds) {
            let ms = gap.as_millis() as u64;
            assert!(ms >= lo && ms < hi, "sleep {ms}ms outside [{lo}, {hi})");
        }
        assert!(gaps[0] < gaps[1] && gaps[1] < gaps[2]);
    }

    #[tokio::test(start_paused = true)]
    async fn non_overload_error_rethrows_without_sleeping() {
        let policy = RetryPolicy::default();
        let calls = Cell::new(0u32);
        let start = tokio::time::Instant::now();

        let result: Result<(), _> = call_with_retry(&policy, || {
            calls.set(calls.get() + 1);
            async {
                Err(LlmError::Http {
                    status: 401,
                    message: "invalid api key".to_string(),
                })
            }
        })
        .await;

        assert!(matches!(result, Err(LlmError::Http { status: 401, .. })));
        assert_eq!(calls.get(), 1, "must not retry a non-overload failure");
        assert_eq!(start.elapsed(), Duration::ZERO, "must not sleep");
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_budget_rethrows_last_error() {
        let policy = RetryPolicy {
            max_retries: 2,
            initial_delay: Duration::from_millis(10),
        };
        let calls = Cell::new(0u32);

        let result: Result<(), _> = call_with_retry(&policy, || {
            calls.set(calls.get() + 1);
            async { Err(overload()) }
        })
        .await;

        assert!(matches!(result, Err(LlmError::Overloaded { .. })));
        // Initial call + 2 retries.
        assert_eq!(calls.get(), 3);
    }
}
