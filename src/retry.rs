//! Bounded retry for batch model requests
//!
//! Every attempt runs under the per-call timeout from [`RetryPolicy`]. A
//! failed attempt is followed by another one after the delay chosen by
//! [`BackoffStrategy`] until `max_attempts` have been spent. The default
//! strategy retries immediately.

use crate::error::{CouncilError, CouncilResult};
use crate::logging::{log_debug, log_error, log_info, log_warn};

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Delay inserted between two attempts of the same request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Retry as soon as the previous attempt failed.
    #[default]
    Immediate,
    /// Wait the same amount of time before every retry.
    Fixed { delay: Duration },
    /// `initial_delay * multiplier^(attempt - 1)`, capped at `max_delay`,
    /// stretched by up to `jitter` (0.1 = 10%).
    Exponential {
        initial_delay: Duration,
        max_delay: Duration,
        multiplier: f64,
        jitter: f64,
    },
}

impl BackoffStrategy {
    /// Exponential backoff starting at 1s, doubling up to 16s with 10% jitter.
    pub fn exponential() -> Self {
        Self::Exponential {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(16),
            multiplier: 2.0,
            jitter: 0.1,
        }
    }

    /// Delay to wait after the given (1-based) failed attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self {
            Self::Immediate => Duration::ZERO,
            Self::Fixed { delay } => *delay,
            Self::Exponential {
                initial_delay,
                max_delay,
                multiplier,
                jitter,
            } => {
                let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
                let delay_seconds = initial_delay.as_secs_f64() * multiplier.powi(exponent);
                let capped = delay_seconds.min(max_delay.as_secs_f64()).max(0.0);

                // Up to `jitter` extra so council members do not retry in lockstep
                let factor = 1.0 + fastrand::f64() * jitter.max(0.0);

                // Out of range for Duration once jitter is applied near the cap
                Duration::try_from_secs_f64(capped * factor).unwrap_or(*max_delay)
            }
        }
    }
}

/// Retry policy applied to each model in batch mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts per request, including the first one
    pub max_attempts: u32,
    /// Timeout for each individual attempt
    pub request_timeout: Duration,
    /// Delay between attempts
    #[serde(default)]
    pub backoff: BackoffStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            request_timeout: Duration::from_secs(300),
            backoff: BackoffStrategy::Immediate,
        }
    }
}

impl RetryPolicy {
    /// Attempts actually performed; a policy of 0 still makes one attempt.
    pub fn effective_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Runs one operation under a [`RetryPolicy`]
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute `operation` until it succeeds, fails with a non-retryable
    /// error, or the attempt budget is spent. Returns the last error on
    /// exhaustion.
    pub async fn execute<F, Fut, T>(&self, model: &str, operation: F) -> CouncilResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = CouncilResult<T>>,
    {
        let max_attempts = self.policy.effective_attempts();
        let start_time = Instant::now();
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            log_debug!(
                model = %model,
                attempt = attempt,
                max_attempts = max_attempts,
                "Executing model request"
            );

            let error = match self.run_attempt(&operation).await {
                Ok(response) => {
                    if attempt > 1 {
                        log_info!(
                            model = %model,
                            attempt = attempt,
                            duration_ms = start_time.elapsed().as_millis() as u64,
                            "Model succeeded after retry"
                        );
                    }
                    return Ok(response);
                }
                Err(error) => error,
            };

            if !error.is_retryable() {
                log_error!(
                    model = %model,
                    attempt = attempt,
                    error = %error,
                    "Model request failed with non-retryable error"
                );
                return Err(error);
            }

            if attempt < max_attempts {
                let delay = self.policy.backoff.delay_for(attempt);
                log_warn!(
                    model = %model,
                    attempt = attempt,
                    max_attempts = max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Model request failed, retrying"
                );
                if !delay.is_zero() {
                    sleep(delay).await;
                }
            }
            last_error = Some(error);
        }

        let final_error = last_error.unwrap_or_else(|| {
            CouncilError::request_failed("Maximum retry attempts exceeded", None)
        });

        log_error!(
            model = %model,
            attempts = max_attempts,
            total_duration_ms = start_time.elapsed().as_millis() as u64,
            error = %final_error,
            "Model request failed after all retry attempts"
        );

        Err(final_error)
    }

    async fn run_attempt<F, Fut, T>(&self, operation: &F) -> CouncilResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = CouncilResult<T>>,
    {
        match tokio::time::timeout(self.policy.request_timeout, operation()).await {
            Ok(result) => result,
            Err(_elapsed) => Err(CouncilError::timeout(
                self.policy.request_timeout.as_secs(),
            )),
        }
    }
}
