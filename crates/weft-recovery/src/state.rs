use serde::{Deserialize, Serialize};
use weft_config::RecoveryStrategyType;
use weft_workflow::{NodeError, WorkflowContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
  Pending,
  Success,
  Failed,
}

/// One recovery attempt made for an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryAttempt {
  /// Unix time in milliseconds when the attempt finished.
  pub timestamp: i64,
  pub strategy: RecoveryStrategyType,
  /// The node type that was dispatched (the fallback type for fallbacks).
  pub node_type: String,
  pub node_id: String,
  /// 1-based.
  pub attempt: u32,
  pub max_attempts: u32,
  /// The error this attempt produced, or for a successful attempt the
  /// error it recovered from.
  pub error: String,
  pub error_type: String,
  pub duration_ms: f64,
  pub status: AttemptStatus,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub output: Option<serde_json::Value>,
}

/// Identity of the execution an error occurred in.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContextSnapshot {
  pub tenant_id: String,
  pub user_id: String,
  pub execution_id: String,
}

impl From<&WorkflowContext> for ContextSnapshot {
  fn from(context: &WorkflowContext) -> Self {
    Self {
      tenant_id: context.tenant_id.clone(),
      user_id: context.user_id.clone(),
      execution_id: context.execution_id.clone(),
    }
  }
}

/// The full recovery record of one handled error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorState {
  pub node_id: String,
  pub node_type: String,
  pub original_error: NodeError,
  /// Unix time in milliseconds when the error was handed to the manager.
  pub error_time: i64,
  pub attempts: Vec<RecoveryAttempt>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub last_attempt: Option<RecoveryAttempt>,
  pub recovered: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub final_error: Option<NodeError>,
  pub context: ContextSnapshot,
}

impl ErrorState {
  pub(crate) fn new(
    node_type: &str,
    node_id: &str,
    error: &NodeError,
    error_time: i64,
    context: &WorkflowContext,
  ) -> Self {
    Self {
      node_id: node_id.to_string(),
      node_type: node_type.to_string(),
      original_error: error.clone(),
      error_time,
      attempts: Vec::new(),
      last_attempt: None,
      recovered: false,
      final_error: None,
      context: ContextSnapshot::from(context),
    }
  }

  /// History key: `{node_id}-{error_time}`.
  pub fn key(&self) -> String {
    state_key(&self.node_id, self.error_time)
  }

  pub(crate) fn push_attempt(&mut self, attempt: RecoveryAttempt) {
    self.last_attempt = Some(attempt.clone());
    self.attempts.push(attempt);
  }
}

pub(crate) fn state_key(node_id: &str, error_time: i64) -> String {
  format!("{}-{}", node_id, error_time)
}
