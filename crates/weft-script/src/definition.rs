//! Script definitions as loaded from the package layer.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::ast::{Expression, Statement, present};
use crate::error::ScriptError;

/// A script: named functions plus shared constants.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ScriptDefinition {
  #[serde(default)]
  pub functions: Vec<FunctionDefinition>,
  #[serde(default)]
  pub constants: Vec<ConstantDefinition>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FunctionDefinition {
  pub name: String,
  #[serde(default)]
  pub params: Vec<ParamDefinition>,
  #[serde(default)]
  pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ParamDefinition {
  pub name: String,
  /// Used when the caller omits the argument. May be a literal, a
  /// reference or an expression.
  #[serde(default, deserialize_with = "present")]
  pub default: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConstantDefinition {
  pub name: String,
  pub value: Value,
}

impl ScriptDefinition {
  pub fn from_value(value: Value) -> Result<Self, ScriptError> {
    serde_json::from_value(value).map_err(|e| ScriptError::InvalidDefinition {
      message: e.to_string(),
    })
  }

  pub fn from_json(json: &str) -> Result<Self, ScriptError> {
    serde_json::from_str(json).map_err(|e| ScriptError::InvalidDefinition {
      message: e.to_string(),
    })
  }

  pub fn from_path(path: &Path) -> Result<Self, ScriptError> {
    let content = std::fs::read_to_string(path).map_err(|e| ScriptError::InvalidDefinition {
      message: format!("failed to read {}: {}", path.display(), e),
    })?;
    Self::from_json(&content)
  }

  /// Look up a function by name.
  pub fn function(&self, name: &str) -> Option<&FunctionDefinition> {
    self.functions.iter().find(|f| f.name == name)
  }
}
