use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

/// The policy applied when a node execution fails.
///
/// Unrecognised names deserialize as [`RecoveryStrategyType::Fail`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryStrategyType {
  /// Re-dispatch the node under an alternate node type.
  Fallback,
  /// Suppress the failure and hand downstream nodes an empty output.
  Skip,
  /// Re-dispatch the same node type with exponential backoff.
  Retry,
  /// Report the original error without attempting recovery.
  #[default]
  Fail,
}

impl RecoveryStrategyType {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Fallback => "fallback",
      Self::Skip => "skip",
      Self::Retry => "retry",
      Self::Fail => "fail",
    }
  }
}

impl<'de> Deserialize<'de> for RecoveryStrategyType {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let name = String::deserialize(deserializer)?;
    Ok(match name.as_str() {
      "fallback" => Self::Fallback,
      "skip" => Self::Skip,
      "retry" => Self::Retry,
      "fail" => Self::Fail,
      other => {
        warn!(strategy = other, "unknown recovery strategy, using fail");
        Self::Fail
      }
    })
  }
}

impl fmt::Display for RecoveryStrategyType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}
