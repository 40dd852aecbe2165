//! Native functions callable from scripts.
//!
//! A `call_expression` names its callee with a reference such as
//! `"$ref:functions.string.upper"`; everything after `functions.` is the key
//! in the [`FunctionTable`]. A function that returns `Err` throws: the error
//! can be intercepted by a `try_catch` statement.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::ScriptError;
use crate::value::{number_value, to_display, to_number};

/// A native function. `undefined` arguments arrive as `null`.
pub type NativeFunction = Arc<dyn Fn(&[Value]) -> Result<Value, ScriptError> + Send + Sync>;

/// Functions bound under the `functions` namespace.
#[derive(Clone, Default)]
pub struct FunctionTable {
  functions: HashMap<String, NativeFunction>,
}

impl fmt::Debug for FunctionTable {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut names: Vec<&String> = self.functions.keys().collect();
    names.sort();
    f.debug_struct("FunctionTable")
      .field("functions", &names)
      .finish()
  }
}

impl FunctionTable {
  /// An empty table.
  pub fn new() -> Self {
    Self::default()
  }

  /// A table holding the standard functions.
  pub fn with_builtins() -> Self {
    let mut table = Self::new();
    register_builtins(&mut table);
    table
  }

  pub fn register<F>(&mut self, name: impl Into<String>, function: F)
  where
    F: Fn(&[Value]) -> Result<Value, ScriptError> + Send + Sync + 'static,
  {
    self.functions.insert(name.into(), Arc::new(function));
  }

  pub fn get(&self, name: &str) -> Option<&NativeFunction> {
    self.functions.get(name)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.functions.contains_key(name)
  }

  pub fn len(&self) -> usize {
    self.functions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.functions.is_empty()
  }
}

fn arg(args: &[Value], index: usize) -> &Value {
  args.get(index).unwrap_or(&Value::Null)
}

fn text(args: &[Value], index: usize) -> String {
  to_display(Some(arg(args, index)))
}

fn type_error(message: impl Into<String>) -> ScriptError {
  ScriptError::thrown("TypeError", message)
}

fn numbers(args: &[Value]) -> Vec<f64> {
  match args {
    [Value::Array(items)] => items.iter().map(|v| to_number(Some(v))).collect(),
    _ => args.iter().map(|v| to_number(Some(v))).collect(),
  }
}

fn register_builtins(table: &mut FunctionTable) {
  table.register("string.upper", |args| Ok(Value::String(text(args, 0).to_uppercase())));
  table.register("string.lower", |args| Ok(Value::String(text(args, 0).to_lowercase())));
  table.register("string.trim", |args| Ok(Value::String(text(args, 0).trim().to_string())));
  table.register("string.length", |args| {
    Ok(Value::from(text(args, 0).chars().count()))
  });
  table.register("string.concat", |args| {
    Ok(Value::String(
      args.iter().map(|v| to_display(Some(v))).collect::<String>(),
    ))
  });

  table.register("array.length", |args| match arg(args, 0) {
    Value::Array(items) => Ok(Value::from(items.len())),
    other => Err(type_error(format!("array.length expects an array, got {}", other))),
  });
  table.register("array.push", |args| match arg(args, 0) {
    Value::Array(items) => {
      let mut items = items.clone();
      items.extend(args.iter().skip(1).cloned());
      Ok(Value::Array(items))
    }
    other => Err(type_error(format!("array.push expects an array, got {}", other))),
  });
  table.register("array.join", |args| match arg(args, 0) {
    Value::Array(items) => {
      let separator = match args.get(1) {
        None | Some(Value::Null) => ",".to_string(),
        Some(sep) => to_display(Some(sep)),
      };
      Ok(Value::String(
        items
          .iter()
          .map(|v| match v {
            Value::Null => String::new(),
            other => to_display(Some(other)),
          })
          .collect::<Vec<_>>()
          .join(&separator),
      ))
    }
    other => Err(type_error(format!("array.join expects an array, got {}", other))),
  });

  table.register("object.keys", |args| match arg(args, 0) {
    Value::Object(map) => Ok(Value::Array(
      map.keys().map(|k| Value::String(k.clone())).collect(),
    )),
    Value::Array(items) => Ok(Value::Array(
      (0..items.len()).map(|i| Value::String(i.to_string())).collect(),
    )),
    other => Err(type_error(format!("object.keys expects an object, got {}", other))),
  });

  table.register("math.floor", |args| Ok(number_value(to_number(Some(arg(args, 0))).floor())));
  table.register("math.ceil", |args| Ok(number_value(to_number(Some(arg(args, 0))).ceil())));
  table.register("math.round", |args| {
    // Halves round towards positive infinity.
    Ok(number_value((to_number(Some(arg(args, 0))) + 0.5).floor()))
  });
  table.register("math.abs", |args| Ok(number_value(to_number(Some(arg(args, 0))).abs())));
  table.register("math.min", |args| {
    let values = numbers(args);
    if values.iter().any(|n| n.is_nan()) {
      return Ok(Value::Null);
    }
    Ok(number_value(values.into_iter().fold(f64::INFINITY, f64::min)))
  });
  table.register("math.max", |args| {
    let values = numbers(args);
    if values.iter().any(|n| n.is_nan()) {
      return Ok(Value::Null);
    }
    Ok(number_value(values.into_iter().fold(f64::NEG_INFINITY, f64::max)))
  });

  table.register("json.stringify", |args| {
    serde_json::to_string(arg(args, 0))
      .map(Value::String)
      .map_err(|e| type_error(e.to_string()))
  });
  table.register("json.parse", |args| {
    serde_json::from_str(&text(args, 0)).map_err(|e| ScriptError::thrown("SyntaxError", e.to_string()))
  });

  // error(message, name?) throws.
  table.register("error", |args| {
    let name = match args.get(1) {
      None | Some(Value::Null) => "Error".to_string(),
      Some(name) => to_display(Some(name)),
    };
    // An object argument is thrown as-is and bound to the catch parameter.
    match args.first() {
      Some(value @ Value::Object(map)) => Err(ScriptError::Thrown {
        name,
        message: map.get("message").map(|m| to_display(Some(m))).unwrap_or_default(),
        value: Some(value.clone()),
      }),
      _ => Err(ScriptError::thrown(name, text(args, 0))),
    }
  });
}
