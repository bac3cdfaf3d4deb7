//! Bounded exponential-backoff retry around a save operation
//!
//! The scheduler itself never retries a failed save. Wrapping an operation in
//! [`Retrying`] makes one scheduler-level attempt consist of up to
//! `max_attempts` calls to the wrapped operation.

use crate::operation::SaveOperation;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total calls per attempt, including the first (default: 3)
    pub max_attempts: u32,
    /// Delay before the first retry (default: 500ms)
    pub initial_backoff_ms: u64,
    /// Upper bound on any single delay (default: 30s)
    pub max_backoff_ms: u64,
    /// Growth factor between delays (default: 2)
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 30_000,
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            max_attempts,
            initial_backoff_ms: initial_backoff.as_millis() as u64,
            ..Self::default()
        }
    }

    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff_ms = max_backoff.as_millis() as u64;
        self
    }

    pub fn with_multiplier(mut self, multiplier: u32) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Delay to wait after failed call number `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = u64::from(self.multiplier.max(1))
            .saturating_pow(attempt.saturating_sub(1));
        let ms = self
            .initial_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("retry.max_attempts must be at least 1".to_string());
        }
        if self.multiplier == 0 {
            return Err("retry.multiplier must be at least 1".to_string());
        }
        if self.max_backoff_ms < self.initial_backoff_ms {
            return Err("retry.max_backoff_ms must not be below retry.initial_backoff_ms".to_string());
        }
        Ok(())
    }
}

/// A save operation that retries its inner operation with backoff
pub struct Retrying<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S> Retrying<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<T, S> SaveOperation<T> for Retrying<S>
where
    T: Clone + Send + 'static,
    S: SaveOperation<T>,
{
    async fn save(&self, value: T) -> anyhow::Result<()> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.inner.save(value.clone()).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < max_attempts => {
                    let delay = self.policy.backoff(attempt);
                    warn!(
                        "Save attempt {}/{} failed, retrying in {:?}: {:#}",
                        attempt, max_attempts, delay, e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(e.context(format!("gave up after {} attempts", max_attempts)));
                }
            }
        }
    }
}
