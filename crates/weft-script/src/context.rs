use std::borrow::Cow;

use serde_json::{Map, Value};

use crate::reference::Scope;

/// Scratch space of one function invocation.
///
/// Owned by a single `run_function` call and never shared. References
/// reach it through the namespaces `params`, `local` (or `local_vars`),
/// `constants` and `catch`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExecutionContext {
  pub params: Map<String, Value>,
  pub local_vars: Map<String, Value>,
  pub constants: Map<String, Value>,
  pub catch: Map<String, Value>,
}

impl ExecutionContext {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_local(mut self, name: impl Into<String>, value: Value) -> Self {
    self.local_vars.insert(name.into(), value);
    self
  }

  pub fn with_param(mut self, name: impl Into<String>, value: Value) -> Self {
    self.params.insert(name.into(), value);
    self
  }

  pub fn local(&self, name: &str) -> Option<&Value> {
    self.local_vars.get(name)
  }

  /// Store a local variable. Storing `undefined` removes it.
  pub fn set_local(&mut self, name: &str, value: Option<Value>) {
    set(&mut self.local_vars, name, value);
  }

  /// Store a parameter. Storing `undefined` removes it.
  pub fn set_param(&mut self, name: &str, value: Option<Value>) {
    set(&mut self.params, name, value);
  }

  fn namespace(&self, name: &str) -> Option<&Map<String, Value>> {
    match name {
      "params" => Some(&self.params),
      "local" | "local_vars" => Some(&self.local_vars),
      "constants" => Some(&self.constants),
      "catch" => Some(&self.catch),
      _ => None,
    }
  }
}

fn set(map: &mut Map<String, Value>, name: &str, value: Option<Value>) {
  match value {
    Some(value) => {
      map.insert(name.to_string(), value);
    }
    None => {
      map.remove(name);
    }
  }
}

impl Scope for ExecutionContext {
  fn lookup(&self, segments: &[&str]) -> Option<Cow<'_, Value>> {
    let (first, rest) = segments.split_first()?;
    let namespace = self.namespace(first)?;
    if rest.is_empty() {
      return Some(Cow::Owned(Value::Object(namespace.clone())));
    }
    namespace.lookup(rest)
  }
}
