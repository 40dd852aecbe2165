//! Per-node fault-tolerance policy.
//!
//! ```json
//! {
//!   "strategy": "retry",
//!   "max_retries": 5,
//!   "retry_delay_ms": 500,
//!   "retry_backoff_multiplier": 2.0,
//!   "max_retry_delay_ms": 10000,
//!   "retryable_errors": ["TimeoutError"]
//! }
//! ```
//!
//! Missing or zero numeric fields fall back to the defaults below.

use serde::{Deserialize, Serialize};

use crate::enums::RecoveryStrategyType;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;
pub const DEFAULT_MAX_RETRY_DELAY_MS: u64 = 30_000;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ErrorRecoveryStrategy {
  #[serde(default)]
  pub strategy: RecoveryStrategyType,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub fallback_node_type: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub max_retries: Option<u32>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub retry_delay_ms: Option<u64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub retry_backoff_multiplier: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub max_retry_delay_ms: Option<u64>,
  /// Error kinds worth retrying. Empty means every kind is retried.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub retryable_errors: Vec<String>,
}

impl ErrorRecoveryStrategy {
  pub fn fail() -> Self {
    Self::default()
  }

  pub fn skip() -> Self {
    Self {
      strategy: RecoveryStrategyType::Skip,
      ..Self::default()
    }
  }

  pub fn fallback(node_type: impl Into<String>) -> Self {
    Self {
      strategy: RecoveryStrategyType::Fallback,
      fallback_node_type: Some(node_type.into()),
      ..Self::default()
    }
  }

  pub fn retry(max_retries: u32) -> Self {
    Self {
      strategy: RecoveryStrategyType::Retry,
      max_retries: Some(max_retries),
      ..Self::default()
    }
  }

  pub fn with_retry_delay_ms(mut self, delay_ms: u64) -> Self {
    self.retry_delay_ms = Some(delay_ms);
    self
  }

  pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
    self.retry_backoff_multiplier = Some(multiplier);
    self
  }

  pub fn with_max_retry_delay_ms(mut self, delay_ms: u64) -> Self {
    self.max_retry_delay_ms = Some(delay_ms);
    self
  }

  pub fn with_retryable_error(mut self, kind: impl Into<String>) -> Self {
    self.retryable_errors.push(kind.into());
    self
  }

  pub fn effective_max_retries(&self) -> u32 {
    self
      .max_retries
      .filter(|n| *n > 0)
      .unwrap_or(DEFAULT_MAX_RETRIES)
  }

  pub fn effective_retry_delay_ms(&self) -> u64 {
    self
      .retry_delay_ms
      .filter(|n| *n > 0)
      .unwrap_or(DEFAULT_RETRY_DELAY_MS)
  }

  pub fn effective_backoff_multiplier(&self) -> f64 {
    self
      .retry_backoff_multiplier
      .filter(|m| m.is_finite() && *m > 0.0)
      .unwrap_or(DEFAULT_BACKOFF_MULTIPLIER)
  }

  pub fn effective_max_retry_delay_ms(&self) -> u64 {
    self
      .max_retry_delay_ms
      .filter(|n| *n > 0)
      .unwrap_or(DEFAULT_MAX_RETRY_DELAY_MS)
  }

  /// Whether a failure of the given kind may be retried.
  pub fn is_retryable(&self, kind: &str) -> bool {
    self.retryable_errors.is_empty() || self.retryable_errors.iter().any(|k| k == kind)
  }
}
