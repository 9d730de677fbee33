//! Bounded exponential backoff for failed cycles.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Backoff applied after a cycle fails as a whole.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackoffPolicy {
    /// Wait after the first failure.
    pub base_delay_ms: u64,
    /// Multiplier for each consecutive failure.
    pub backoff_factor: f64,
    /// Ceiling for the wait.
    pub max_delay_ms: u64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self { base_delay_ms: 10_000, backoff_factor: 2.0, max_delay_ms: 300_000 }
    }
}

impl BackoffPolicy {
    pub fn from_secs(base_secs: u64, max_secs: u64) -> Self {
        Self {
            base_delay_ms: base_secs.max(1) * 1_000,
            max_delay_ms: max_secs * 1_000,
            ..Default::default()
        }
    }

    /// Delay after `consecutive_failures` failures in a row (1-indexed).
    /// Never below the base delay, never above the cap (unless the cap is below the base).
    pub fn delay_for(&self, consecutive_failures: u32) -> Duration {
        if consecutive_failures == 0 {
            return Duration::ZERO;
        }
        let exponent = (consecutive_failures - 1).min(32) as i32;
        let delay_ms = self.base_delay_ms as f64 * self.backoff_factor.max(1.0).powi(exponent);
        let cap = self.max_delay_ms.max(self.base_delay_ms) as f64;
        Duration::from_millis(delay_ms.min(cap) as u64)
    }
}

/// Failure streak of the scheduled loop.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryState {
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
}

impl RetryState {
    /// Record a failure and return how long to wait before retrying.
    pub fn record_failure(&mut self, policy: &BackoffPolicy, error: &str) -> Duration {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_error = Some(error.to_string());
        let delay = policy.delay_for(self.consecutive_failures);
        warn!(
            consecutive_failures = self.consecutive_failures,
            delay_secs = delay.as_secs(),
            "Cycle failed, backing off"
        );
        delay
    }

    pub fn record_success(&mut self) {
        *self = Self::default();
    }
}
