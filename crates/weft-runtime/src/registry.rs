use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use weft_workflow::{
  ExecutionState, NodeDispatcher, NodeError, NodeExecutor, NodeResult, WorkflowContext,
  WorkflowNode,
};

/// Executors keyed by node type.
#[derive(Default, Clone)]
pub struct ExecutorRegistry {
  executors: HashMap<String, Arc<dyn NodeExecutor>>,
}

impl ExecutorRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register `executor` for `node_type`, replacing any previous one.
  pub fn register(&mut self, node_type: impl Into<String>, executor: Arc<dyn NodeExecutor>) {
    self.executors.insert(node_type.into(), executor);
  }

  pub fn with_executor(mut self, node_type: impl Into<String>, executor: Arc<dyn NodeExecutor>) -> Self {
    self.register(node_type, executor);
    self
  }

  pub fn get(&self, node_type: &str) -> Option<&Arc<dyn NodeExecutor>> {
    self.executors.get(node_type)
  }

  pub fn contains(&self, node_type: &str) -> bool {
    self.executors.contains_key(node_type)
  }

  /// Registered node types, sorted.
  pub fn node_types(&self) -> Vec<&str> {
    let mut types: Vec<&str> = self.executors.keys().map(String::as_str).collect();
    types.sort_unstable();
    types
  }
}

impl std::fmt::Debug for ExecutorRegistry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ExecutorRegistry")
      .field("node_types", &self.node_types())
      .finish()
  }
}

#[async_trait]
impl NodeDispatcher for ExecutorRegistry {
  async fn dispatch(
    &self,
    node_type: &str,
    node: &WorkflowNode,
    context: &WorkflowContext,
    state: &ExecutionState,
  ) -> Result<NodeResult, NodeError> {
    let executor = self.get(node_type).ok_or_else(|| {
      NodeError::new(
        "UnknownNodeType",
        format!("no executor registered for node type '{}'", node_type),
      )
    })?;
    executor.execute(node, context, state).await
  }
}
