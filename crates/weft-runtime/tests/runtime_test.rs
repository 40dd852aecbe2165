//! Integration tests for NodeRuntime::execute_node.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use weft_config::{ErrorRecoveryStrategy, Settings};
use weft_runtime::{ExecutorRegistry, NodeRuntime, RuntimeError};
use weft_workflow::{
  ExecutionState, NodeError, NodeExecutor, NodeResult, NodeStatus, WorkflowContext, WorkflowNode,
};

/// Fails `failures` times, then echoes the node config.
struct Flaky {
  failures: u32,
  calls: AtomicU32,
}

impl Flaky {
  fn new(failures: u32) -> Arc<Self> {
    Arc::new(Self {
      failures,
      calls: AtomicU32::new(0),
    })
  }
}

#[async_trait]
impl NodeExecutor for Flaky {
  async fn execute(
    &self,
    node: &WorkflowNode,
    _context: &WorkflowContext,
    _state: &ExecutionState,
  ) -> Result<NodeResult, NodeError> {
    let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
    if n <= self.failures {
      Err(NodeError::new("HttpError", format!("503 on call {}", n)))
    } else {
      Ok(NodeResult::success(node.config.clone()))
    }
  }
}

/// Returns an error result instead of an `Err`.
struct Unhealthy;

#[async_trait]
impl NodeExecutor for Unhealthy {
  async fn execute(
    &self,
    _node: &WorkflowNode,
    _context: &WorkflowContext,
    _state: &ExecutionState,
  ) -> Result<NodeResult, NodeError> {
    Ok(NodeResult::error("service unhealthy"))
  }
}

fn runtime_with(node_type: &str, executor: Arc<dyn NodeExecutor>) -> NodeRuntime {
  let registry = ExecutorRegistry::new().with_executor(node_type, executor);
  NodeRuntime::with_registry(registry, &Settings::default())
}

fn fallback_script() -> Value {
  json!({
    "functions": [{
      "name": "main",
      "body": [{ "type": "return", "value": { "type": "object_literal", "properties": { "cached": true } } }]
    }]
  })
}

async fn run(runtime: &NodeRuntime, node: &WorkflowNode, context: &WorkflowContext) -> Result<NodeResult, RuntimeError> {
  runtime
    .execute_node(node, context, &ExecutionState::default(), CancellationToken::new())
    .await
}

#[tokio::test]
async fn test_script_node_success() {
  let runtime = NodeRuntime::from_settings(&Settings::default());
  let context = WorkflowContext::new("t1", "u1", "e1").with_data(json!({ "a": 2, "b": 3 }));
  let node = WorkflowNode::new("sum", "script").with_config(json!({
    "script": {
      "functions": [{
        "name": "main",
        "params": [{ "name": "a" }, { "name": "b" }],
        "body": [{
          "type": "return",
          "value": { "type": "binary_expression", "operator": "+", "left": "$ref:params.a", "right": "$ref:params.b" }
        }]
      }]
    },
    "args": ["$ref:data.a", "$ref:data.b"]
  }));

  let result = run(&runtime, &node, &context).await.unwrap();
  assert_eq!(result.status, NodeStatus::Success);
  assert_eq!(result.output, json!(5));
  assert_eq!(runtime.recovery().metrics().total_errors, 0);
}

#[tokio::test(start_paused = true)]
async fn test_retry_recovers_flaky_node() {
  let runtime = runtime_with("http", Flaky::new(2));
  let node = WorkflowNode::new("fetch", "http")
    .with_config(json!({ "url": "https://example.test" }))
    .with_recovery(ErrorRecoveryStrategy::retry(3).with_retry_delay_ms(50));

  let result = run(&runtime, &node, &WorkflowContext::default()).await.unwrap();
  assert!(result.is_success());
  assert_eq!(result.output, json!({ "url": "https://example.test" }));

  let states = runtime.recovery().error_states_for_node("fetch");
  assert_eq!(states.len(), 1);
  assert!(states[0].recovered);
  // The first failure triggered recovery; retries 1 and 2 cover the
  // second failure and the success.
  assert_eq!(states[0].attempts.len(), 2);
  assert_eq!(runtime.recovery().recovery_success_rate(), 100.0);
}

#[tokio::test]
async fn test_fallback_to_script() {
  let runtime = runtime_with("http", Flaky::new(u32::MAX));
  let context = WorkflowContext::default().with_script("cache", fallback_script());
  let node = WorkflowNode::new("fetch", "http")
    .with_config(json!({ "script": "cache" }))
    .with_recovery(ErrorRecoveryStrategy::fallback("script"));

  let result = run(&runtime, &node, &context).await.unwrap();
  assert!(result.is_success());
  assert_eq!(result.output, json!({ "cached": true }));
}

#[tokio::test]
async fn test_skip_yields_skipped_result() {
  let runtime = runtime_with("http", Arc::new(Unhealthy));
  let node = WorkflowNode::new("fetch", "http").with_recovery(ErrorRecoveryStrategy::skip());

  let result = run(&runtime, &node, &WorkflowContext::default()).await.unwrap();
  assert_eq!(result.status, NodeStatus::Skipped);
  assert_eq!(result.output, json!({}));
}

#[tokio::test]
async fn test_default_strategy_fails() {
  let runtime = runtime_with("http", Arc::new(Unhealthy));
  let node = WorkflowNode::new("fetch", "http");

  let result = run(&runtime, &node, &WorkflowContext::default()).await.unwrap();
  assert_eq!(result.status, NodeStatus::Error);
  assert_eq!(result.error.as_deref(), Some("service unhealthy"));

  let metrics = runtime.recovery().metrics();
  assert_eq!(metrics.recovery_failed, 1);
  assert_eq!(metrics.errors_by_type.get("NodeExecutionError"), Some(&1));
}

#[tokio::test]
async fn test_unknown_node_type_goes_through_recovery() {
  let runtime = NodeRuntime::from_settings(&Settings::default());
  let node = WorkflowNode::new("n1", "lua");

  let result = run(&runtime, &node, &WorkflowContext::default()).await.unwrap();
  assert_eq!(result.status, NodeStatus::Error);
  assert_eq!(
    runtime.recovery().metrics().errors_by_type.get("UnknownNodeType"),
    Some(&1)
  );
}

#[tokio::test]
async fn test_configuration_error_bypasses_recovery() {
  let runtime = NodeRuntime::from_settings(&Settings::default());
  let context = WorkflowContext::default().with_script("cache", fallback_script());
  let node = WorkflowNode::new("n1", "script")
    .with_config(json!({ "script": "cache", "function": "missing" }))
    .with_recovery(ErrorRecoveryStrategy::skip());

  let err = run(&runtime, &node, &context).await.unwrap_err();
  match err {
    RuntimeError::Configuration { node_id, kind, message } => {
      assert_eq!(node_id, "n1");
      assert_eq!(kind, "FunctionNotFound");
      assert_eq!(message, "Function not found: missing");
    }
    other => panic!("expected configuration error, got {:?}", other),
  }
  assert_eq!(runtime.recovery().metrics().total_errors, 0);
}

#[tokio::test]
async fn test_cancelled_before_start() {
  let runtime = NodeRuntime::from_settings(&Settings::default());
  let node = WorkflowNode::new("n1", "script");
  let cancel = CancellationToken::new();
  cancel.cancel();

  let err = runtime
    .execute_node(&node, &WorkflowContext::default(), &ExecutionState::default(), cancel)
    .await
    .unwrap_err();
  assert!(matches!(err, RuntimeError::Cancelled));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_retry_backoff() {
  let runtime = runtime_with("http", Flaky::new(u32::MAX));
  let node = WorkflowNode::new("fetch", "http")
    .with_recovery(ErrorRecoveryStrategy::retry(5).with_retry_delay_ms(60_000));
  let cancel = CancellationToken::new();

  let trigger = cancel.clone();
  tokio::spawn(async move {
    tokio::time::sleep(std::time::Duration::from_secs(1)).await;
    trigger.cancel();
  });

  let err = runtime
    .execute_node(&node, &WorkflowContext::default(), &ExecutionState::default(), cancel)
    .await
    .unwrap_err();
  assert!(matches!(err, RuntimeError::Cancelled));

  let states = runtime.recovery().error_states_for_node("fetch");
  assert_eq!(states.len(), 1);
  assert!(!states[0].recovered);
}
