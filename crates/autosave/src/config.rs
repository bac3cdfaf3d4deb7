//! Autosave configuration

use crate::error::{AutosaveError, Result};
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default debounce window (10 seconds)
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

/// Longest accepted debounce window (1 hour)
pub const MAX_INTERVAL: Duration = Duration::from_secs(3600);

/// Scheduler configuration
///
/// Durations are stored as milliseconds so the struct maps directly onto the
/// `[autosave]` table of the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutosaveConfig {
    /// Quiet period after the last update before a save starts (default: 10000)
    pub interval_ms: u64,

    /// Skip a flush whose pending value was already saved successfully
    pub skip_unchanged: bool,

    /// Treat a save that runs longer than this as failed (default: none)
    ///
    /// The write itself is not cancelled; later saves wait for it.
    pub save_timeout_ms: Option<u64>,

    /// Retry failed saves with backoff (default: none)
    pub retry: Option<RetryPolicy>,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL.as_millis() as u64,
            skip_unchanged: false,
            save_timeout_ms: None,
            retry: None,
        }
    }
}

impl AutosaveConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn skip_unchanged(mut self, skip: bool) -> Self {
        self.skip_unchanged = skip;
        self
    }

    pub fn with_save_timeout(mut self, timeout: Duration) -> Self {
        self.save_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn save_timeout(&self) -> Option<Duration> {
        self.save_timeout_ms.map(Duration::from_millis)
    }

    /// Check ranges before a scheduler is built from this config
    pub fn validate(&self) -> Result<()> {
        if self.interval_ms == 0 {
            return Err(AutosaveError::InvalidConfig(
                "interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.interval() > MAX_INTERVAL {
            return Err(AutosaveError::InvalidConfig(format!(
                "interval_ms must be at most {}",
                MAX_INTERVAL.as_millis()
            )));
        }
        if self.save_timeout_ms == Some(0) {
            return Err(AutosaveError::InvalidConfig(
                "save_timeout_ms must be greater than 0 when set".to_string(),
            ));
        }
        if let Some(retry) = &self.retry {
            retry.validate().map_err(AutosaveError::InvalidConfig)?;
        }
        Ok(())
    }
}
