//! Node execution result types.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
  Success,
  Error,
  /// Failure suppressed by a `skip` recovery strategy.
  Skipped,
}

/// Result of a single node execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeResult {
  pub status: NodeStatus,
  /// Node output handed to downstream nodes.
  #[serde(default)]
  pub output: serde_json::Value,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

impl NodeResult {
  pub fn success(output: serde_json::Value) -> Self {
    Self {
      status: NodeStatus::Success,
      output,
      error: None,
    }
  }

  pub fn error(message: impl Into<String>) -> Self {
    Self {
      status: NodeStatus::Error,
      output: serde_json::Value::Null,
      error: Some(message.into()),
    }
  }

  pub fn skipped() -> Self {
    Self {
      status: NodeStatus::Skipped,
      output: serde_json::json!({}),
      error: None,
    }
  }

  pub fn is_success(&self) -> bool {
    self.status == NodeStatus::Success
  }
}
