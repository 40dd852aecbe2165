use std::error::Error;

use serde::{Deserialize, Serialize};

/// An error raised by a node executor.
///
/// `kind` stands in for the error's type name: it keys the error-type
/// histogram and is matched against a strategy's `retryable_errors`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct NodeError {
  pub kind: String,
  pub message: String,
  /// Configuration errors are reported straight to the caller and never go
  /// through a recovery strategy.
  #[serde(default, skip_serializing_if = "std::ops::Not::not")]
  pub fatal: bool,
}

impl NodeError {
  pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
    Self {
      kind: kind.into(),
      message: message.into(),
      fatal: false,
    }
  }

  /// An error caused by a bad node or script definition.
  pub fn configuration(kind: impl Into<String>, message: impl Into<String>) -> Self {
    Self {
      fatal: true,
      ..Self::new(kind, message)
    }
  }

  /// Wrap any error, using its short type name as the kind.
  pub fn from_error<E: Error>(err: &E) -> Self {
    let full = std::any::type_name::<E>();
    let base = full.split('<').next().unwrap_or(full);
    let kind = base.rsplit("::").next().unwrap_or(base);
    Self::new(kind, err.to_string())
  }
}
