//! The recovery state machine.

use std::time::Duration;

use chrono::Utc;
use indexmap::IndexMap;
use parking_lot::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use weft_config::{ErrorRecoveryStrategy, RecoverySettings, RecoveryStrategyType};
use weft_workflow::{
  ExecutionState, NodeDispatcher, NodeError, NodeResult, WorkflowContext, WorkflowNode,
};

use crate::backoff::BackoffPolicy;
use crate::metrics::{ErrorMetrics, ErrorStatistics, MetricsExport, RecentError, RecoveryTimes};
use crate::result::RecoveryResult;
use crate::state::{AttemptStatus, ErrorState, RecoveryAttempt, state_key};

const CANCELLED: &str = "recovery cancelled";
const FALLBACK_UNAVAILABLE: &str = "Fallback node type not configured or registry unavailable";
const DISPATCHER_UNAVAILABLE: &str = "Registry execute function not available";
/// Kind given to a node result that came back without success status.
const UNSUCCESSFUL_RESULT: &str = "NodeExecutionError";

/// A failed node execution handed to the manager.
#[derive(Debug, Clone, Copy)]
pub struct RecoveryRequest<'a> {
  pub node_type: &'a str,
  pub node_id: &'a str,
  pub error: &'a NodeError,
  pub strategy: &'a ErrorRecoveryStrategy,
  pub node: &'a WorkflowNode,
  pub context: &'a WorkflowContext,
  pub state: &'a ExecutionState,
}

/// Applies recovery strategies and keeps metrics and a bounded error-state
/// history.
///
/// One instance is meant to be shared (behind an `Arc`) by every node
/// execution of an engine. Shared state sits behind a mutex that is never
/// held across an `.await`.
pub struct ErrorRecoveryManager {
  limits: RecoverySettings,
  inner: Mutex<Inner>,
}

struct Inner {
  metrics: ErrorMetrics,
  /// Insertion-ordered so eviction drops the oldest state.
  error_states: IndexMap<String, ErrorState>,
  recovery_times: RecoveryTimes,
  /// Last handed-out error time. Survives `clear_metrics` so keys stay unique.
  last_error_time: i64,
}

impl Inner {
  /// `now`, bumped past the previous error time so each state gets its own key.
  fn next_error_time(&mut self, now: i64) -> i64 {
    let at = now.max(self.last_error_time + 1);
    self.last_error_time = at;
    at
  }
}

/// How a strategy ended, before bookkeeping.
struct Outcome {
  success: bool,
  output: Option<serde_json::Value>,
  error: Option<String>,
  final_error: Option<NodeError>,
}

impl Outcome {
  fn success(output: serde_json::Value) -> Self {
    Self {
      success: true,
      output: Some(output),
      error: None,
      final_error: None,
    }
  }

  fn failure(message: impl Into<String>, final_error: NodeError) -> Self {
    Self {
      success: false,
      output: None,
      error: Some(message.into()),
      final_error: Some(final_error),
    }
  }

  fn cancelled() -> Self {
    Self::failure(CANCELLED, NodeError::new("Cancelled", CANCELLED))
  }
}

impl Default for ErrorRecoveryManager {
  fn default() -> Self {
    Self::new(RecoverySettings::default())
  }
}

impl ErrorRecoveryManager {
  pub fn new(limits: RecoverySettings) -> Self {
    let recovery_times = RecoveryTimes::new(limits.max_recovery_history);
    Self {
      limits,
      inner: Mutex::new(Inner {
        metrics: ErrorMetrics::default(),
        error_states: IndexMap::new(),
        recovery_times,
        last_error_time: 0,
      }),
    }
  }

  pub fn limits(&self) -> &RecoverySettings {
    &self.limits
  }

  /// Apply `request.strategy` to a failed node execution.
  ///
  /// `dispatcher` executes nodes for the fallback and retry strategies;
  /// without it those strategies fail immediately. Cancelling `cancel`
  /// interrupts backoff waits and in-flight dispatches.
  #[instrument(
    name = "recovery_handle_error",
    skip_all,
    fields(
      node_id = %request.node_id,
      node_type = %request.node_type,
      strategy = %request.strategy.strategy,
      execution_id = %request.context.execution_id,
    )
  )]
  pub async fn handle_error(
    &self,
    request: RecoveryRequest<'_>,
    dispatcher: Option<&dyn NodeDispatcher>,
    cancel: &CancellationToken,
  ) -> RecoveryResult {
    let start = Instant::now();
    let strategy = request.strategy.strategy;

    warn!(
      error = %request.error,
      error_type = %request.error.kind,
      "handling node error"
    );

    let error_time = {
      let mut inner = self.inner.lock();
      let error_time = inner.next_error_time(Utc::now().timestamp_millis());
      inner.metrics.record_error(
        &request.error.kind,
        request.node_type,
        strategy,
        error_time,
      );
      error_time
    };

    let mut error_state = ErrorState::new(
      request.node_type,
      request.node_id,
      request.error,
      error_time,
      request.context,
    );

    let outcome = match strategy {
      RecoveryStrategyType::Fail => Outcome::failure(
        request.error.message.clone(),
        request.error.clone(),
      ),
      RecoveryStrategyType::Skip => self.apply_skip(&request, &mut error_state),
      RecoveryStrategyType::Fallback => {
        self
          .apply_fallback(&request, dispatcher, &mut error_state, cancel)
          .await
      }
      RecoveryStrategyType::Retry => {
        self
          .apply_retry(&request, dispatcher, &mut error_state, cancel)
          .await
      }
    };

    let total_duration_ms = elapsed_ms(start);
    let result = RecoveryResult {
      success: outcome.success,
      strategy,
      attempts: u32::try_from(error_state.attempts.len()).unwrap_or(u32::MAX),
      total_duration_ms,
      output: outcome.output,
      error: outcome.error,
      recovery_attempts: error_state.attempts.clone(),
    };

    error_state.recovered = outcome.success;
    error_state.final_error = outcome.final_error;
    self.finish(error_state, outcome.success, total_duration_ms);

    if result.success {
      info!(attempts = result.attempts, duration_ms = total_duration_ms, "node recovered");
    } else {
      warn!(
        attempts = result.attempts,
        error = result.error.as_deref().unwrap_or_default(),
        "recovery failed"
      );
    }

    result
  }

  fn apply_skip(&self, request: &RecoveryRequest<'_>, error_state: &mut ErrorState) -> Outcome {
    error_state.push_attempt(RecoveryAttempt {
      timestamp: Utc::now().timestamp_millis(),
      strategy: RecoveryStrategyType::Skip,
      node_type: request.node_type.to_string(),
      node_id: request.node_id.to_string(),
      attempt: 1,
      max_attempts: 1,
      error: request.error.message.clone(),
      error_type: request.error.kind.clone(),
      duration_ms: 0.0,
      status: AttemptStatus::Success,
      output: None,
    });
    Outcome::success(serde_json::json!({}))
  }

  async fn apply_fallback(
    &self,
    request: &RecoveryRequest<'_>,
    dispatcher: Option<&dyn NodeDispatcher>,
    error_state: &mut ErrorState,
    cancel: &CancellationToken,
  ) -> Outcome {
    let (Some(fallback_type), Some(dispatcher)) =
      (request.strategy.fallback_node_type.as_deref(), dispatcher)
    else {
      return Outcome::failure(
        FALLBACK_UNAVAILABLE,
        NodeError::configuration("FallbackUnavailable", FALLBACK_UNAVAILABLE),
      );
    };

    debug!(fallback_type = %fallback_type, "dispatching fallback");
    let attempt_start = Instant::now();
    let Some(result) = dispatch(dispatcher, fallback_type, request, cancel).await else {
      return Outcome::cancelled();
    };
    let duration_ms = elapsed_ms(attempt_start);

    let mut attempt = RecoveryAttempt {
      timestamp: Utc::now().timestamp_millis(),
      strategy: RecoveryStrategyType::Fallback,
      node_type: fallback_type.to_string(),
      node_id: request.node.id.clone(),
      attempt: 1,
      max_attempts: 1,
      error: request.error.message.clone(),
      error_type: request.error.kind.clone(),
      duration_ms,
      status: AttemptStatus::Success,
      output: None,
    };

    let outcome = match result {
      Ok(result) if result.is_success() => {
        attempt.output = Some(result.output.clone());
        Outcome::success(result.output)
      }
      Ok(result) => {
        let err = unsuccessful(&result);
        attempt.status = AttemptStatus::Failed;
        attempt.error = err.message.clone();
        attempt.error_type = err.kind.clone();
        attempt.output = Some(result.output);
        Outcome::failure(format!("Fallback execution failed: {}", err.message), err)
      }
      Err(err) => {
        attempt.status = AttemptStatus::Failed;
        attempt.error = err.message.clone();
        attempt.error_type = err.kind.clone();
        Outcome::failure(format!("Fallback failed: {}", err.message), err)
      }
    };

    error_state.push_attempt(attempt);
    outcome
  }

  async fn apply_retry(
    &self,
    request: &RecoveryRequest<'_>,
    dispatcher: Option<&dyn NodeDispatcher>,
    error_state: &mut ErrorState,
    cancel: &CancellationToken,
  ) -> Outcome {
    let Some(dispatcher) = dispatcher else {
      return Outcome::failure(
        DISPATCHER_UNAVAILABLE,
        NodeError::configuration("DispatcherUnavailable", DISPATCHER_UNAVAILABLE),
      );
    };

    let strategy = request.strategy;
    if !strategy.is_retryable(&request.error.kind) {
      return Outcome::failure(
        format!(
          "{} is not retryable: {}",
          request.error.kind, request.error.message
        ),
        request.error.clone(),
      );
    }

    let max_retries = strategy.effective_max_retries();
    let backoff = BackoffPolicy::from_strategy(strategy);
    let mut last_error = request.error.clone();
    let mut previous_delay = Duration::ZERO;

    for attempt in 1..=max_retries {
      if attempt > 1 {
        let delay = backoff.next_delay(attempt, previous_delay);
        previous_delay = delay;
        debug!(attempt, delay_ms = delay.as_millis() as u64, "waiting before retry");
        tokio::select! {
          biased;
          _ = cancel.cancelled() => return Outcome::cancelled(),
          _ = tokio::time::sleep(delay) => {}
        }
      }

      let attempt_start = Instant::now();
      let Some(result) = dispatch(dispatcher, request.node_type, request, cancel).await else {
        return Outcome::cancelled();
      };
      let duration_ms = elapsed_ms(attempt_start);

      let mut record = RecoveryAttempt {
        timestamp: Utc::now().timestamp_millis(),
        strategy: RecoveryStrategyType::Retry,
        node_type: request.node_type.to_string(),
        node_id: request.node_id.to_string(),
        attempt,
        max_attempts: max_retries,
        error: last_error.message.clone(),
        error_type: last_error.kind.clone(),
        duration_ms,
        status: AttemptStatus::Success,
        output: None,
      };

      let err = match result {
        Ok(result) if result.is_success() => {
          record.output = Some(result.output.clone());
          error_state.push_attempt(record);
          return Outcome::success(result.output);
        }
        Ok(result) => {
          let err = unsuccessful(&result);
          record.output = Some(result.output);
          err
        }
        Err(err) => err,
      };

      debug!(attempt, error = %err, "retry attempt failed");
      record.status = AttemptStatus::Failed;
      record.error = err.message.clone();
      record.error_type = err.kind.clone();
      error_state.push_attempt(record);
      last_error = err;

      if attempt < max_retries && !strategy.is_retryable(&last_error.kind) {
        return Outcome::failure(
          format!(
            "Retry stopped after {} of {} attempts, {} is not retryable: {}",
            attempt, max_retries, last_error.kind, last_error.message
          ),
          last_error,
        );
      }
    }

    Outcome::failure(
      format!(
        "All {} retry attempts failed: {}",
        max_retries, last_error.message
      ),
      last_error,
    )
  }

  fn finish(&self, error_state: ErrorState, success: bool, duration_ms: f64) {
    let mut inner = self.inner.lock();
    if success {
      inner.metrics.recovery_success += 1;
      let average = inner.recovery_times.record(duration_ms);
      inner.metrics.average_recovery_time = average;
    } else {
      inner.metrics.recovery_failed += 1;
    }

    // Re-inserting an existing key keeps its position, so drop it first.
    let key = error_state.key();
    inner.error_states.shift_remove(&key);
    inner.error_states.insert(key, error_state);
    while inner.error_states.len() > self.limits.max_error_states {
      inner.error_states.shift_remove_index(0);
    }
  }

  /// A snapshot of the counters.
  pub fn metrics(&self) -> ErrorMetrics {
    self.inner.lock().metrics.clone()
  }

  pub fn error_statistics(&self) -> ErrorStatistics {
    self.inner.lock().metrics.statistics()
  }

  /// Percentage of handled errors that were recovered; 0 when none.
  pub fn recovery_success_rate(&self) -> f64 {
    self.inner.lock().metrics.success_rate()
  }

  /// Summary, histograms and the most recent error states.
  pub fn export_metrics(&self) -> MetricsExport {
    let inner = self.inner.lock();
    let len = inner.error_states.len();
    let skip = len.saturating_sub(self.limits.recent_errors);
    let recent = inner
      .error_states
      .values()
      .skip(skip)
      .map(RecentError::from)
      .collect();
    MetricsExport::new(&inner.metrics, recent)
  }

  /// The state stored for `node_id` at `error_time` (Unix ms).
  pub fn error_state(&self, node_id: &str, error_time: i64) -> Option<ErrorState> {
    self
      .inner
      .lock()
      .error_states
      .get(&state_key(node_id, error_time))
      .cloned()
  }

  /// Stored states of a node, oldest first.
  pub fn error_states_for_node(&self, node_id: &str) -> Vec<ErrorState> {
    self
      .inner
      .lock()
      .error_states
      .values()
      .filter(|state| state.node_id == node_id)
      .cloned()
      .collect()
  }

  pub fn error_state_count(&self) -> usize {
    self.inner.lock().error_states.len()
  }

  /// Reset counters, histograms and the recovery-time window.
  pub fn clear_metrics(&self) {
    let mut inner = self.inner.lock();
    inner.metrics = ErrorMetrics::default();
    inner.recovery_times.clear();
  }

  pub fn clear_error_states(&self) {
    self.inner.lock().error_states.clear();
  }
}

/// Dispatch `node_type`, or `None` once `cancel` fires.
async fn dispatch(
  dispatcher: &dyn NodeDispatcher,
  node_type: &str,
  request: &RecoveryRequest<'_>,
  cancel: &CancellationToken,
) -> Option<Result<NodeResult, NodeError>> {
  tokio::select! {
    biased;
    _ = cancel.cancelled() => None,
    result = dispatcher.dispatch(node_type, request.node, request.context, request.state) => Some(result),
  }
}

fn unsuccessful(result: &NodeResult) -> NodeError {
  let message = result
    .error
    .clone()
    .unwrap_or_else(|| format!("node finished with status {:?}", result.status));
  NodeError::new(UNSUCCESSFUL_RESULT, message)
}

fn elapsed_ms(start: Instant) -> f64 {
  start.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
  use super::*;

  fn node() -> WorkflowNode {
    WorkflowNode::new("n1", "http")
  }

  #[tokio::test]
  async fn test_fail_records_state_without_attempts() {
    let manager = ErrorRecoveryManager::default();
    let node = node();
    let context = WorkflowContext::new("t1", "u1", "e1");
    let state = ExecutionState::default();
    let error = NodeError::new("TimeoutError", "upstream timed out");
    let strategy = ErrorRecoveryStrategy::fail();

    let result = manager
      .handle_error(
        RecoveryRequest {
          node_type: "http",
          node_id: "n1",
          error: &error,
          strategy: &strategy,
          node: &node,
          context: &context,
          state: &state,
        },
        None,
        &CancellationToken::new(),
      )
      .await;

    assert!(!result.success);
    assert_eq!(result.attempts, 0);
    assert_eq!(result.error.as_deref(), Some("upstream timed out"));

    let states = manager.error_states_for_node("n1");
    assert_eq!(states.len(), 1);
    assert!(!states[0].recovered);
    assert_eq!(states[0].final_error.as_ref(), Some(&error));
    assert_eq!(states[0].context.tenant_id, "t1");

    let metrics = manager.metrics();
    assert_eq!(metrics.recovery_failed, 1);
    assert_eq!(metrics.errors_by_type.get("TimeoutError"), Some(&1));
  }

  #[tokio::test]
  async fn test_error_state_lookup_by_time() {
    let manager = ErrorRecoveryManager::default();
    let node = node();
    let context = WorkflowContext::default();
    let state = ExecutionState::default();
    let error = NodeError::new("Error", "boom");
    let strategy = ErrorRecoveryStrategy::skip();

    manager
      .handle_error(
        RecoveryRequest {
          node_type: "http",
          node_id: "n1",
          error: &error,
          strategy: &strategy,
          node: &node,
          context: &context,
          state: &state,
        },
        None,
        &CancellationToken::new(),
      )
      .await;

    let stored = manager.error_states_for_node("n1").remove(0);
    assert_eq!(stored.key(), format!("n1-{}", stored.error_time));
    assert_eq!(manager.error_state("n1", stored.error_time), Some(stored));
    assert_eq!(manager.error_state("n1", 0), None);
  }
}
