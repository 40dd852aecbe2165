use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Per-execution context supplied by the engine.
///
/// Authentication has already been resolved into `tenant_id` / `user_id`
/// by the caller.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowContext {
  pub tenant_id: String,
  pub user_id: String,
  pub execution_id: String,
  /// Workflow input data.
  pub data: serde_json::Value,
  /// Resolved user profile.
  pub user: serde_json::Value,
  /// Pre-parsed script definitions keyed by name.
  pub scripts: HashMap<String, serde_json::Value>,
}

impl WorkflowContext {
  pub fn new(
    tenant_id: impl Into<String>,
    user_id: impl Into<String>,
    execution_id: impl Into<String>,
  ) -> Self {
    Self {
      tenant_id: tenant_id.into(),
      user_id: user_id.into(),
      execution_id: execution_id.into(),
      ..Self::default()
    }
  }

  pub fn with_data(mut self, data: serde_json::Value) -> Self {
    self.data = data;
    self
  }

  pub fn with_script(mut self, name: impl Into<String>, definition: serde_json::Value) -> Self {
    self.scripts.insert(name.into(), definition);
    self
  }
}

/// Engine-defined execution state. Opaque to weft apart from being readable
/// by script arguments.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionState {
  /// Outputs of nodes that already completed, keyed by node id.
  pub outputs: HashMap<String, serde_json::Value>,
  /// Free-form engine variables.
  pub variables: serde_json::Map<String, serde_json::Value>,
}

impl ExecutionState {
  /// JSON view of the state, used for reference resolution.
  pub fn to_value(&self) -> serde_json::Value {
    serde_json::json!({
      "outputs": self.outputs,
      "variables": self.variables,
    })
  }
}
