//! Interpreter error types.

/// Errors raised while evaluating or executing a script.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScriptError {
  /// The requested function is not defined on the script.
  #[error("Function not found: {name}")]
  FunctionNotFound { name: String },

  /// An expression node carried an unrecognized `type`.
  #[error("unknown expression kind '{kind}'")]
  UnknownExpressionKind { kind: String },

  /// A statement node carried an unrecognized `type`.
  #[error("unknown statement kind '{kind}'")]
  UnknownStatementKind { kind: String },

  /// The script definition could not be parsed.
  #[error("invalid script definition: {message}")]
  InvalidDefinition { message: String },

  /// A value thrown at runtime (by a native function). The only error a
  /// `try_catch` statement intercepts.
  #[error("{name}: {message}")]
  Thrown {
    name: String,
    message: String,
    value: Option<serde_json::Value>,
  },
}

impl ScriptError {
  pub fn thrown(name: impl Into<String>, message: impl Into<String>) -> Self {
    Self::Thrown {
      name: name.into(),
      message: message.into(),
      value: None,
    }
  }

  /// Short name of the error: the variant, or the thrown error's name.
  pub fn kind(&self) -> &str {
    match self {
      Self::FunctionNotFound { .. } => "FunctionNotFound",
      Self::UnknownExpressionKind { .. } => "UnknownExpressionKind",
      Self::UnknownStatementKind { .. } => "UnknownStatementKind",
      Self::InvalidDefinition { .. } => "InvalidDefinition",
      Self::Thrown { name, .. } => name,
    }
  }

  /// Whether a `try_catch` statement may intercept this error.
  pub fn is_catchable(&self) -> bool {
    matches!(self, Self::Thrown { .. })
  }

  /// Whether the error stems from a bad definition rather than from
  /// runtime data.
  pub fn is_configuration(&self) -> bool {
    !self.is_catchable()
  }

  /// The value bound to the catch parameter.
  pub fn catch_value(&self) -> serde_json::Value {
    match self {
      Self::Thrown {
        value: Some(value), ..
      } => value.clone(),
      Self::Thrown { name, message, .. } => serde_json::json!({
        "name": name,
        "message": message,
      }),
      other => serde_json::json!({
        "name": "Error",
        "message": other.to_string(),
      }),
    }
  }
}
