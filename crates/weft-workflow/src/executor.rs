use async_trait::async_trait;

use crate::WorkflowNode;
use crate::context::{ExecutionState, WorkflowContext};
use crate::error::NodeError;
use crate::result::NodeResult;

/// A concrete node implementation (script, Lua, HTTP, ...).
#[async_trait]
pub trait NodeExecutor: Send + Sync {
  /// Execute one node.
  ///
  /// A returned `Err` and an `Ok` result whose status is not success are both
  /// treated as node failures by the caller.
  async fn execute(
    &self,
    node: &WorkflowNode,
    context: &WorkflowContext,
    state: &ExecutionState,
  ) -> Result<NodeResult, NodeError>;
}

/// Routes a node to the executor registered for `node_type`.
///
/// The recovery manager uses this to retry a node or to re-run it under a
/// fallback type.
#[async_trait]
pub trait NodeDispatcher: Send + Sync {
  async fn dispatch(
    &self,
    node_type: &str,
    node: &WorkflowNode,
    context: &WorkflowContext,
    state: &ExecutionState,
  ) -> Result<NodeResult, NodeError>;
}
