//! Recovery-wrapped node execution.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};
use weft_config::{ErrorRecoveryStrategy, RecoveryStrategyType, Settings};
use weft_recovery::{ErrorRecoveryManager, RecoveryRequest};
use weft_workflow::{
  ExecutionState, NodeDispatcher, NodeError, NodeResult, WorkflowContext, WorkflowNode,
};

use crate::error::RuntimeError;
use crate::registry::ExecutorRegistry;
use crate::script::{SCRIPT_NODE_TYPE, ScriptExecutor};

/// Executes single nodes on behalf of a workflow engine.
///
/// The engine decides which node runs next; the runtime dispatches it and
/// applies the node's recovery strategy when it fails.
pub struct NodeRuntime {
  registry: Arc<ExecutorRegistry>,
  recovery: Arc<ErrorRecoveryManager>,
}

impl NodeRuntime {
  pub fn new(registry: ExecutorRegistry, recovery: Arc<ErrorRecoveryManager>) -> Self {
    Self {
      registry: Arc::new(registry),
      recovery,
    }
  }

  /// A runtime with the script executor registered and a fresh recovery
  /// manager, both configured from `settings`.
  pub fn from_settings(settings: &Settings) -> Self {
    Self::with_registry(ExecutorRegistry::new(), settings)
  }

  /// Like [`from_settings`](Self::from_settings), with extra executors.
  /// A `script` executor in `registry` takes precedence over the default.
  pub fn with_registry(mut registry: ExecutorRegistry, settings: &Settings) -> Self {
    if !registry.contains(SCRIPT_NODE_TYPE) {
      registry.register(
        SCRIPT_NODE_TYPE,
        Arc::new(ScriptExecutor::from_settings(&settings.script)),
      );
    }
    let recovery = Arc::new(ErrorRecoveryManager::new(settings.recovery.clone()));
    Self::new(registry, recovery)
  }

  pub fn registry(&self) -> &ExecutorRegistry {
    &self.registry
  }

  pub fn recovery(&self) -> &Arc<ErrorRecoveryManager> {
    &self.recovery
  }

  /// Execute a node.
  ///
  /// Failures go through the node's `error_recovery` strategy (`fail` when
  /// unset) and come back as an error or skipped [`NodeResult`]. Only
  /// cancellation and configuration errors are returned as `Err`.
  #[instrument(
    name = "node_execute",
    skip(self, node, context, state, cancel),
    fields(
      execution_id = %context.execution_id,
      node_id = %node.id,
      node_type = %node.node_type,
    )
  )]
  pub async fn execute_node(
    &self,
    node: &WorkflowNode,
    context: &WorkflowContext,
    state: &ExecutionState,
    cancel: CancellationToken,
  ) -> Result<NodeResult, RuntimeError> {
    if cancel.is_cancelled() {
      return Err(RuntimeError::Cancelled);
    }

    info!("node started");

    let dispatched = tokio::select! {
      biased;
      _ = cancel.cancelled() => return Err(RuntimeError::Cancelled),
      result = self.registry.dispatch(&node.node_type, node, context, state) => result,
    };

    let failure = match dispatched {
      Ok(result) if result.is_success() => {
        info!(output = %result.output, "node completed");
        return Ok(result);
      }
      Ok(result) => NodeError::new(
        "NodeExecutionError",
        result
          .error
          .unwrap_or_else(|| format!("node finished with status {:?}", result.status)),
      ),
      Err(e) if e.fatal => {
        error!(error = %e, kind = %e.kind, "node misconfigured");
        return Err(RuntimeError::Configuration {
          node_id: node.id.clone(),
          kind: e.kind,
          message: e.message,
        });
      }
      Err(e) => e,
    };

    warn!(error = %failure, kind = %failure.kind, "node failed");

    let strategy = node.error_recovery.clone().unwrap_or_else(ErrorRecoveryStrategy::fail);
    let dispatcher: &dyn NodeDispatcher = self.registry.as_ref();
    let recovery = self
      .recovery
      .handle_error(
        RecoveryRequest {
          node_type: &node.node_type,
          node_id: &node.id,
          error: &failure,
          strategy: &strategy,
          node,
          context,
          state,
        },
        Some(dispatcher),
        &cancel,
      )
      .await;

    if cancel.is_cancelled() {
      return Err(RuntimeError::Cancelled);
    }

    if !recovery.success {
      let message = recovery.error.unwrap_or(failure.message);
      error!(error = %message, attempts = recovery.attempts, "node failed after recovery");
      return Ok(NodeResult::error(message));
    }

    if recovery.strategy == RecoveryStrategyType::Skip {
      info!("node skipped");
      return Ok(NodeResult::skipped());
    }

    let output = recovery.output.unwrap_or_default();
    info!(output = %output, attempts = recovery.attempts, "node completed after recovery");
    Ok(NodeResult::success(output))
  }
}
