//! Runtime error types.

/// Errors that stop a node execution outright. Recoverable failures are
/// reported as an error [`NodeResult`](weft_workflow::NodeResult) instead.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
  /// Execution was cancelled.
  #[error("execution cancelled")]
  Cancelled,

  /// The node is misconfigured; no recovery strategy applies.
  #[error("invalid configuration for node '{node_id}': {kind}: {message}")]
  Configuration {
    node_id: String,
    kind: String,
    message: String,
  },
}
