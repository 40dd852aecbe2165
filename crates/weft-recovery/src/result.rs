use serde::{Deserialize, Serialize};
use weft_config::RecoveryStrategyType;

use crate::state::RecoveryAttempt;

/// Outcome of [`ErrorRecoveryManager::handle_error`](crate::ErrorRecoveryManager::handle_error).
///
/// A failed recovery is reported here, never as an `Err`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryResult {
  pub success: bool,
  pub strategy: RecoveryStrategyType,
  /// Number of recovery attempts made.
  pub attempts: u32,
  pub total_duration_ms: f64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub output: Option<serde_json::Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub recovery_attempts: Vec<RecoveryAttempt>,
}
