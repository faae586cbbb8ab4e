//! Retry engine wrapping every remote operation.
//!
//! An operation is attempted until it succeeds, fails with a terminal
//! classification, or the policy's attempt/time budget runs out. Terminal
//! errors are returned unchanged; on exhaustion the last error is returned.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{ClientError, Result};

/// Attempt and time budget for one logical operation.
///
/// Timeouts of `0` disable the corresponding bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_backoff_ms: u64,
    /// Upper bound for any single delay
    pub max_backoff_ms: u64,
    /// Bound on a single attempt
    pub attempt_timeout_ms: u64,
    /// Bound on all attempts and delays together
    pub overall_timeout_ms: u64,
    /// Randomize delays by ±25%
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::read_default()
    }
}

impl RetryPolicy {
    /// Default policy for read operations (get, list).
    pub fn read_default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff_ms: 100,
            max_backoff_ms: 2_000,
            attempt_timeout_ms: 30_000,
            overall_timeout_ms: 60_000,
            jitter: true,
        }
    }

    /// Default policy for mutating operations.
    pub fn write_default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 250,
            max_backoff_ms: 5_000,
            attempt_timeout_ms: 60_000,
            overall_timeout_ms: 180_000,
            jitter: true,
        }
    }

    /// A single attempt with no time bound.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
            attempt_timeout_ms: 0,
            overall_timeout_ms: 0,
            jitter: false,
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff_ms = initial.as_millis() as u64;
        self.max_backoff_ms = max.as_millis() as u64;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_overall_timeout(mut self, timeout: Duration) -> Self {
        self.overall_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn attempt_timeout(&self) -> Option<Duration> {
        (self.attempt_timeout_ms > 0).then(|| Duration::from_millis(self.attempt_timeout_ms))
    }

    pub fn overall_timeout(&self) -> Option<Duration> {
        (self.overall_timeout_ms > 0).then(|| Duration::from_millis(self.overall_timeout_ms))
    }

    /// Delay after the `attempt`-th failure (1-based), before jitter.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(20);
        let calculated = self.initial_backoff_ms.saturating_mul(1_u64 << shift);
        Duration::from_millis(calculated.min(self.max_backoff_ms))
    }

    fn jittered_delay(&self, attempt: u32) -> Duration {
        let delay = self.delay_for_attempt(attempt);
        if !self.jitter || delay.is_zero() {
            return delay;
        }
        let factor = rand::thread_rng().gen_range(0.75..1.25);
        delay.mul_f64(factor).min(Duration::from_millis(self.max_backoff_ms))
    }

    /// Check that the policy can make progress.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(ClientError::BadArgument(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(ClientError::BadArgument(format!(
                "initial backoff ({}ms) exceeds max backoff ({}ms)",
                self.initial_backoff_ms, self.max_backoff_ms
            )));
        }
        Ok(())
    }
}

/// Run `attempt_fn` under `policy`, retrying transient failures.
///
/// Attempts run strictly one after another. Dropping the returned future
/// cancels the in-flight attempt and any pending delay.
pub async fn retry<T, F, Fut>(label: &str, policy: &RetryPolicy, mut attempt_fn: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let deadline = policy.overall_timeout().map(|timeout| Instant::now() + timeout);
    let mut attempt = 0;

    loop {
        attempt += 1;

        let limit = match (policy.attempt_timeout(), deadline) {
            (Some(per_attempt), Some(deadline)) => {
                Some(per_attempt.min(deadline.saturating_duration_since(Instant::now())))
            }
            (Some(per_attempt), None) => Some(per_attempt),
            (None, Some(deadline)) => Some(deadline.saturating_duration_since(Instant::now())),
            (None, None) => None,
        };

        let outcome = match limit {
            Some(limit) => match tokio::time::timeout(limit, attempt_fn()).await {
                Ok(outcome) => outcome,
                Err(_) => Err(ClientError::Unidentified(format!(
                    "{} timed out after {}ms",
                    label,
                    limit.as_millis()
                ))),
            },
            None => attempt_fn().await,
        };

        let err = match outcome {
            Ok(value) => {
                if attempt > 1 {
                    debug!(operation = %label, attempt, "Operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        if !err.is_transient() {
            debug!(operation = %label, attempt, code = %err.code(), error = %err, "Operation failed, not retrying");
            return Err(err);
        }

        if attempt >= max_attempts {
            warn!(operation = %label, attempt, error = %err, "Operation failed, attempts exhausted");
            return Err(err);
        }

        let delay = policy.jittered_delay(attempt);
        if let Some(deadline) = deadline {
            // No attempt may start at or after the deadline.
            let remaining = deadline.saturating_duration_since(Instant::now());
            if delay >= remaining {
                warn!(operation = %label, attempt, error = %err, "Operation failed, time budget exhausted");
                return Err(err);
            }
        }

        warn!(
            operation = %label,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Operation failed, retrying"
        );
        tokio::time::sleep(delay).await;
    }
}
