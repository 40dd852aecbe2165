//! Weft Script
//!
//! A tree-walking interpreter for node logic written as JSON expression and
//! statement trees. Workflow authors get conditionals, templated strings and
//! loops without an arbitrary code-execution sandbox.
//!
//! The pieces, leaves first:
//! - [`resolve`]: `"$ref:a.b.c"` dotted-path lookup against a [`Scope`]
//! - [`Interpreter::evaluate`]: [`Expression`] trees to JSON values
//! - [`Interpreter::execute`]: [`Statement`] trees against an [`ExecutionContext`]
//! - [`Interpreter::run_function`]: parameter binding and function bodies
//!
//! `undefined` is represented as `None` throughout: evaluation returns
//! `Option<serde_json::Value>`.

mod ast;
mod builtins;
mod context;
mod definition;
mod error;
mod eval;
mod exec;
mod interpreter;
mod reference;
mod runner;
mod value;

pub use ast::{
  AssignTarget, BinaryOp, CatchClause, DeclarationKind, Expression, LogicalOp, Property,
  Statement, UnaryOp,
};
pub use builtins::{FunctionTable, NativeFunction};
pub use context::ExecutionContext;
pub use definition::{ConstantDefinition, FunctionDefinition, ParamDefinition, ScriptDefinition};
pub use error::ScriptError;
pub use exec::Completion;
pub use interpreter::{Interpreter, InterpreterOptions};
pub use reference::{REF_PREFIX, Scope, lookup_path, reference_path, resolve};
pub use value::{number_value, strict_equals, to_display, to_number, truthy, type_of};
