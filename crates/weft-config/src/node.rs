use serde::{Deserialize, Serialize};

use crate::strategy::ErrorRecoveryStrategy;

/// Canvas position of a node. Carried through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
  pub x: f64,
  pub y: f64,
}

/// A single workflow-graph step as handed over by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDef {
  pub id: String,
  /// Executor key, e.g. `script`, `lua`, `http`.
  #[serde(rename = "type")]
  pub node_type: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub label: Option<String>,
  /// Executor-specific configuration payload.
  #[serde(default)]
  pub config: serde_json::Value,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub position: Option<Position>,
  /// Fault-tolerance policy applied when this node fails.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error_recovery: Option<ErrorRecoveryStrategy>,
}

impl NodeDef {
  pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      node_type: node_type.into(),
      label: None,
      config: serde_json::Value::Null,
      position: None,
      error_recovery: None,
    }
  }

  pub fn with_config(mut self, config: serde_json::Value) -> Self {
    self.config = config;
    self
  }

  pub fn with_recovery(mut self, strategy: ErrorRecoveryStrategy) -> Self {
    self.error_recovery = Some(strategy);
    self
  }
}
