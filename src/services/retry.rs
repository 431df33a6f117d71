//! Bounded retry of transient store failures
//!
//! Exponential backoff with a cap and proportional jitter. Only errors that
//! [`StoreError::is_transient`] classifies as transient are retried.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::config::AdmissionConfig;
use crate::utils::errors::{StoreError, StoreResult};
use crate::utils::logging::log_store_retry;

/// Maximum exponent for exponential backoff calculation to prevent overflow
const MAX_BACKOFF_EXPONENT: u32 = 30;

/// Default jitter factor (0.0 = no jitter, 1.0 = full jitter)
const DEFAULT_JITTER_FACTOR: f64 = 0.3;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(1),
            jitter_factor: DEFAULT_JITTER_FACTOR,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: max_delay.max(base_delay),
            jitter_factor: DEFAULT_JITTER_FACTOR,
        }
    }

    pub fn from_config(config: &AdmissionConfig) -> Self {
        Self::new(config.max_store_attempts, config.base_delay(), config.max_delay())
    }

    /// A policy that never retries
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    pub fn with_jitter_factor(mut self, factor: f64) -> Self {
        self.jitter_factor = factor.clamp(0.0, 1.0);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before retry number `attempt` (0-based), without jitter
    pub fn backoff(&self, attempt: u32) -> Duration {
        let base_millis = self.base_delay.as_millis() as u64;
        let max_millis = self.max_delay.as_millis() as u64;
        let multiplier = 2_u64.saturating_pow(attempt.min(MAX_BACKOFF_EXPONENT));

        Duration::from_millis(base_millis.saturating_mul(multiplier).min(max_millis))
    }

    /// Delay before retry number `attempt` with jitter applied
    pub fn delay(&self, attempt: u32) -> Duration {
        let backoff = self.backoff(attempt);
        if self.jitter_factor == 0.0 || backoff.is_zero() {
            return backoff;
        }

        let millis = backoff.as_millis() as f64;
        let spread = millis * self.jitter_factor;
        let jittered = rand::thread_rng().gen_range((millis - spread)..=(millis + spread));
        Duration::from_millis(jittered.max(0.0) as u64)
    }

    /// Run `operation` until it succeeds, fails permanently, or attempts run out
    pub async fn run<T, F, Fut>(&self, operation_name: &str, mut operation: F) -> StoreResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = StoreResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_transient() && attempt + 1 < self.max_attempts => {
                    let delay = self.delay(attempt);
                    log_store_retry(
                        operation_name,
                        attempt + 1,
                        delay.as_millis() as u64,
                        &error.to_string(),
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(Self::exhausted(error)),
            }
        }
    }

    fn exhausted(error: StoreError) -> StoreError {
        if error.is_transient() {
            tracing::error!(error = %error, "Store retries exhausted");
        }
        error
    }
}
