use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::ConfigError;
use crate::gate::ExecutionMode;
use crate::policy::{RetryDelay, RetryPolicy};

// ============================================================================
// Retry Settings
// ============================================================================
//
// Serializable subset of a retryer configuration, for hosts that keep retry
// behaviour in a config file:
//
//   { "retry": 5, "retry_delay_ms": 250, "execution_mode": "always" }
//
// Predicates and computed delays cannot be expressed here; set them on the
// builder directly.
//
// ============================================================================

/// `retry` accepts either a boolean or an attempt bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RetrySetting {
    Enabled(bool),
    Limit(u32),
}

impl Default for RetrySetting {
    fn default() -> Self {
        RetrySetting::Limit(3)
    }
}

impl<E> From<RetrySetting> for RetryPolicy<E> {
    fn from(setting: RetrySetting) -> Self {
        match setting {
            RetrySetting::Enabled(retry) => retry.into(),
            RetrySetting::Limit(max) => max.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySettings {
    /// Retry rule; defaults to three retries
    pub retry: RetrySetting,
    /// Fixed delay between attempts; exponential backoff when absent
    pub retry_delay_ms: Option<u64>,
    pub execution_mode: ExecutionMode,
}

impl RetrySettings {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn retry_policy<E>(&self) -> RetryPolicy<E> {
        self.retry.into()
    }

    pub fn retry_delay<E>(&self) -> RetryDelay<E> {
        match self.retry_delay_ms {
            Some(ms) => RetryDelay::Fixed(Duration::from_millis(ms)),
            None => RetryDelay::default(),
        }
    }
}
