//! Error and recovery counters.

use std::collections::VecDeque;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use weft_config::RecoveryStrategyType;

use crate::state::ErrorState;

/// Counters over every error handled by a manager.
///
/// Each handled error increments `total_errors`, `recovery_attempts` and
/// exactly one bucket of each histogram, whatever the number of retries.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ErrorMetrics {
  pub total_errors: u64,
  pub recovery_attempts: u64,
  pub recovery_success: u64,
  pub recovery_failed: u64,
  pub errors_by_type: IndexMap<String, u64>,
  pub errors_by_node_type: IndexMap<String, u64>,
  pub errors_by_strategy: IndexMap<RecoveryStrategyType, u64>,
  /// Mean over the recovery-time window, in milliseconds.
  pub average_recovery_time: f64,
  /// Unix time in milliseconds of the last handled error; 0 if none.
  pub last_error_time: i64,
}

impl ErrorMetrics {
  pub(crate) fn record_error(
    &mut self,
    error_type: &str,
    node_type: &str,
    strategy: RecoveryStrategyType,
    at: i64,
  ) {
    self.total_errors += 1;
    self.recovery_attempts += 1;
    self.last_error_time = at;
    *self.errors_by_type.entry(error_type.to_string()).or_default() += 1;
    *self.errors_by_node_type.entry(node_type.to_string()).or_default() += 1;
    *self.errors_by_strategy.entry(strategy).or_default() += 1;
  }

  /// Percentage of handled errors that were recovered; 0 when none.
  pub fn success_rate(&self) -> f64 {
    if self.recovery_attempts == 0 {
      return 0.0;
    }
    self.recovery_success as f64 / self.recovery_attempts as f64 * 100.0
  }

  pub fn statistics(&self) -> ErrorStatistics {
    ErrorStatistics {
      by_type: self
        .errors_by_type
        .iter()
        .map(|(error_type, count)| TypeCount {
          error_type: error_type.clone(),
          count: *count,
        })
        .collect(),
      by_node_type: self
        .errors_by_node_type
        .iter()
        .map(|(node_type, count)| NodeTypeCount {
          node_type: node_type.clone(),
          count: *count,
        })
        .collect(),
      by_strategy: self
        .errors_by_strategy
        .iter()
        .map(|(strategy, count)| StrategyCount {
          strategy: *strategy,
          count: *count,
        })
        .collect(),
    }
  }
}

/// Sliding window of successful recovery durations with a running sum.
#[derive(Debug, Clone)]
pub(crate) struct RecoveryTimes {
  samples: VecDeque<f64>,
  sum: f64,
  capacity: usize,
}

impl RecoveryTimes {
  pub(crate) fn new(capacity: usize) -> Self {
    Self {
      samples: VecDeque::with_capacity(capacity.min(1024)),
      sum: 0.0,
      capacity,
    }
  }

  /// Add a sample, dropping the oldest past capacity. Returns the new mean.
  pub(crate) fn record(&mut self, duration_ms: f64) -> f64 {
    self.samples.push_back(duration_ms);
    if self.samples.len() > self.capacity {
      while self.samples.len() > self.capacity {
        self.samples.pop_front();
      }
      // Recompute from the window rather than subtracting the evicted sample.
      self.sum = self.samples.iter().sum();
    } else {
      self.sum += duration_ms;
    }
    self.mean()
  }

  pub(crate) fn mean(&self) -> f64 {
    if self.samples.is_empty() {
      0.0
    } else {
      self.sum / self.samples.len() as f64
    }
  }

  #[cfg(test)]
  pub(crate) fn len(&self) -> usize {
    self.samples.len()
  }

  pub(crate) fn clear(&mut self) {
    self.samples.clear();
    self.sum = 0.0;
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeCount {
  #[serde(rename = "type")]
  pub error_type: String,
  pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeTypeCount {
  pub node_type: String,
  pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyCount {
  pub strategy: RecoveryStrategyType,
  pub count: u64,
}

/// Histograms flattened into lists, in first-seen order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ErrorStatistics {
  pub by_type: Vec<TypeCount>,
  pub by_node_type: Vec<NodeTypeCount>,
  pub by_strategy: Vec<StrategyCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
  pub total_errors: u64,
  pub recovery_attempts: u64,
  pub recovery_success: u64,
  pub recovery_failed: u64,
  pub success_rate: f64,
  pub average_recovery_time: f64,
  pub last_error_time: i64,
}

/// Condensed view of an [`ErrorState`] for monitoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentError {
  pub node_id: String,
  pub node_type: String,
  pub error: String,
  pub error_type: String,
  pub timestamp: i64,
  pub recovered: bool,
  pub attempt_count: usize,
}

impl From<&ErrorState> for RecentError {
  fn from(state: &ErrorState) -> Self {
    Self {
      node_id: state.node_id.clone(),
      node_type: state.node_type.clone(),
      error: state.original_error.message.clone(),
      error_type: state.original_error.kind.clone(),
      timestamp: state.error_time,
      recovered: state.recovered,
      attempt_count: state.attempts.len(),
    }
  }
}

/// Everything a monitoring sink needs in one serializable value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsExport {
  pub summary: MetricsSummary,
  pub statistics: ErrorStatistics,
  pub recent_errors: Vec<RecentError>,
}

impl MetricsExport {
  pub(crate) fn new(metrics: &ErrorMetrics, recent_errors: Vec<RecentError>) -> Self {
    Self {
      summary: MetricsSummary {
        total_errors: metrics.total_errors,
        recovery_attempts: metrics.recovery_attempts,
        recovery_success: metrics.recovery_success,
        recovery_failed: metrics.recovery_failed,
        success_rate: metrics.success_rate(),
        average_recovery_time: metrics.average_recovery_time,
        last_error_time: metrics.last_error_time,
      },
      statistics: metrics.statistics(),
      recent_errors,
    }
  }
}
