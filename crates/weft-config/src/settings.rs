//! Process-level runtime settings.
//!
//! All fields are optional in the file; anything left out keeps its default.
//!
//! ```json
//! {
//!   "recovery": { "max_error_states": 500, "max_recovery_history": 1000, "recent_errors": 10 },
//!   "script": { "strict_kinds": true }
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
  pub recovery: RecoverySettings,
  pub script: ScriptSettings,
}

/// Retention limits for the error recovery manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoverySettings {
  /// Error states kept before the oldest is evicted.
  pub max_error_states: usize,
  /// Recovery durations kept for the running average.
  pub max_recovery_history: usize,
  /// Error states listed in the metrics export.
  pub recent_errors: usize,
}

impl Default for RecoverySettings {
  fn default() -> Self {
    Self {
      max_error_states: 500,
      max_recovery_history: 1000,
      recent_errors: 10,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptSettings {
  /// Reject unrecognized expression/statement kinds instead of treating
  /// them as `undefined` / no-ops.
  pub strict_kinds: bool,
}

impl Default for ScriptSettings {
  fn default() -> Self {
    Self { strict_kinds: true }
  }
}

impl Settings {
  /// Load settings from a JSON file.
  pub fn load(path: &Path) -> Result<Self, SettingsError> {
    let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let settings: Settings =
      serde_json::from_str(&content).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
      })?;
    settings.validate()?;
    Ok(settings)
  }

  /// Load settings from `path` if given, otherwise use defaults.
  pub fn load_or_default(path: Option<&Path>) -> Result<Self, SettingsError> {
    match path {
      Some(path) => Self::load(path),
      None => Ok(Self::default()),
    }
  }

  pub fn validate(&self) -> Result<(), SettingsError> {
    if self.recovery.max_error_states == 0 {
      return Err(SettingsError::Invalid {
        field: "recovery.max_error_states",
        message: "must be at least 1".to_string(),
      });
    }
    if self.recovery.max_recovery_history == 0 {
      return Err(SettingsError::Invalid {
        field: "recovery.max_recovery_history",
        message: "must be at least 1".to_string(),
      });
    }
    Ok(())
  }
}
