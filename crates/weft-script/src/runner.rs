//! Function invocation.

use serde_json::Value;
use tracing::{debug, error, instrument};

use crate::context::ExecutionContext;
use crate::definition::{FunctionDefinition, ScriptDefinition};
use crate::error::ScriptError;
use crate::exec::Completion;
use crate::interpreter::Interpreter;

impl Interpreter {
  /// Run the named function of `script` with positional `args`.
  ///
  /// Constants are loaded first, then each parameter is bound to its
  /// argument, or to its default (evaluated against the constants and the
  /// parameters bound so far), or left unset. Returns the value of the first
  /// `return` reached, or `None` when the body falls off the end.
  #[instrument(
    name = "script_run_function",
    skip(self, script, args),
    fields(function = %name, args = args.len())
  )]
  pub fn run_function(
    &self,
    script: &ScriptDefinition,
    name: &str,
    args: &[Value],
  ) -> Result<Option<Value>, ScriptError> {
    let function = script
      .function(name)
      .ok_or_else(|| ScriptError::FunctionNotFound {
        name: name.to_string(),
      })?;

    let mut ctx = ExecutionContext::new();
    for constant in &script.constants {
      ctx
        .constants
        .insert(constant.name.clone(), constant.value.clone());
    }

    let result = self.call(function, args, &mut ctx);
    match &result {
      Ok(value) => debug!(returned = ?value, "function completed"),
      Err(e) => error!(error = %e, "function failed"),
    }
    result
  }

  fn call(
    &self,
    function: &FunctionDefinition,
    args: &[Value],
    ctx: &mut ExecutionContext,
  ) -> Result<Option<Value>, ScriptError> {
    for (i, param) in function.params.iter().enumerate() {
      let value = match (args.get(i), &param.default) {
        (Some(arg), _) => Some(arg.clone()),
        (None, Some(default)) => self.evaluate(default, ctx)?,
        (None, None) => None,
      };
      ctx.set_param(&param.name, value);
    }

    match self.execute_block(&function.body, ctx)? {
      Completion::Return(value) => Ok(value),
      Completion::Normal => Ok(None),
    }
  }
}
