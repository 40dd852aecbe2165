//! Fault tolerance around node executions.
//!
//! The [`ErrorRecoveryManager`] receives a failed node execution together
//! with the node's [`ErrorRecoveryStrategy`](weft_config::ErrorRecoveryStrategy)
//! and either fails, skips, re-dispatches under a fallback node type, or
//! retries with exponential backoff. Every handled error is recorded as an
//! [`ErrorState`] in a bounded history and counted in [`ErrorMetrics`].

mod backoff;
mod manager;
mod metrics;
mod result;
mod state;

pub use backoff::{BackoffPolicy, JITTER_RATIO};
pub use manager::{ErrorRecoveryManager, RecoveryRequest};
pub use metrics::{
  ErrorMetrics, ErrorStatistics, MetricsExport, MetricsSummary, NodeTypeCount, RecentError,
  StrategyCount, TypeCount,
};
pub use result::RecoveryResult;
pub use state::{AttemptStatus, ContextSnapshot, ErrorState, RecoveryAttempt};
