//! Statement execution.

use serde_json::Value;
use tracing::{debug, warn};

use crate::ast::{AssignTarget, CatchClause, Expression, Statement};
use crate::context::ExecutionContext;
use crate::error::ScriptError;
use crate::interpreter::Interpreter;
use crate::value::truthy;

/// How a statement finished.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
  /// Fall through to the next statement.
  Normal,
  /// A `return` was hit; unwinds to the function boundary. `None` is a
  /// return of `undefined`.
  Return(Option<Value>),
}

impl Interpreter {
  /// Execute statements in order, stopping at the first `return`.
  pub fn execute_block(
    &self,
    statements: &[Statement],
    ctx: &mut ExecutionContext,
  ) -> Result<Completion, ScriptError> {
    for statement in statements {
      if let Completion::Return(value) = self.execute(statement, ctx)? {
        return Ok(Completion::Return(value));
      }
    }
    Ok(Completion::Normal)
  }

  /// Execute a single statement.
  pub fn execute(
    &self,
    statement: &Statement,
    ctx: &mut ExecutionContext,
  ) -> Result<Completion, ScriptError> {
    match statement {
      Statement::Declaration { name, value, .. } => {
        let value = self.evaluate_optional(value.as_ref(), ctx)?;
        ctx.set_local(name, value);
        Ok(Completion::Normal)
      }

      Statement::Assignment { target, value } => {
        let value = self.evaluate_optional(value.as_ref(), ctx)?;
        match target {
          AssignTarget::Local(name) => ctx.set_local(name, value),
          AssignTarget::Param(name) => ctx.set_param(name, value),
          AssignTarget::Unsupported(target) => {
            warn!(target = %target, "assignment to unsupported target ignored");
          }
        }
        Ok(Completion::Normal)
      }

      Statement::If {
        condition,
        then,
        otherwise,
      } => {
        let condition = self.evaluate(condition, ctx)?;
        if truthy(condition.as_ref()) {
          self.execute_block(then, ctx)
        } else {
          self.execute_block(otherwise, ctx)
        }
      }

      Statement::Return { value } => {
        let value = self.evaluate_optional(value.as_ref(), ctx)?;
        Ok(Completion::Return(value))
      }

      Statement::TryCatch {
        body,
        catch,
        finally,
      } => {
        let outcome = match self.execute_block(body, ctx) {
          Err(err) if err.is_catchable() => match catch {
            Some(clause) => self.run_catch(clause, &err, ctx),
            None => Err(err),
          },
          other => other,
        };

        // The finally block's own return is discarded; its errors are not.
        if !finally.is_empty() {
          self.execute_block(finally, ctx)?;
        }
        outcome
      }

      Statement::Call(expr) => {
        self.evaluate(expr, ctx)?;
        Ok(Completion::Normal)
      }

      Statement::ForEach {
        iterator,
        iterable,
        body,
      } => {
        let items = match self.evaluate(iterable, ctx)? {
          Some(Value::Array(items)) => items,
          other => {
            debug!(iterator = %iterator, value = ?other, "for_each over a non-array is a no-op");
            return Ok(Completion::Normal);
          }
        };

        for item in items {
          ctx.set_local(iterator, Some(item));
          if let Completion::Return(value) = self.execute_block(body, ctx)? {
            return Ok(Completion::Return(value));
          }
        }
        Ok(Completion::Normal)
      }

      Statement::Comment => Ok(Completion::Normal),

      Statement::Unknown { kind } => {
        if self.options.strict_kinds {
          return Err(ScriptError::UnknownStatementKind { kind: kind.clone() });
        }
        warn!(kind = %kind, "unknown statement kind skipped");
        Ok(Completion::Normal)
      }
    }
  }

  fn evaluate_optional(
    &self,
    expr: Option<&Expression>,
    ctx: &ExecutionContext,
  ) -> Result<Option<Value>, ScriptError> {
    match expr {
      Some(expr) => self.evaluate(expr, ctx),
      None => Ok(None),
    }
  }

  fn run_catch(
    &self,
    clause: &CatchClause,
    err: &ScriptError,
    ctx: &mut ExecutionContext,
  ) -> Result<Completion, ScriptError> {
    debug!(param = %clause.param, error = %err, "caught script error");
    ctx.catch.insert(clause.param.clone(), err.catch_value());
    self.execute_block(&clause.body, ctx)
  }
}
