use crate::builtins::FunctionTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterpreterOptions {
  /// Fail on unrecognized expression/statement kinds. When off they
  /// evaluate to `undefined` and execute as no-ops.
  pub strict_kinds: bool,
}

impl Default for InterpreterOptions {
  fn default() -> Self {
    Self { strict_kinds: true }
  }
}

/// The tree-walking interpreter.
///
/// Holds only immutable configuration (the bound function table and
/// options); all per-call state lives in the
/// [`ExecutionContext`](crate::ExecutionContext) passed to each method, so a
/// single interpreter can serve concurrent invocations.
#[derive(Debug, Clone)]
pub struct Interpreter {
  pub(crate) functions: FunctionTable,
  pub(crate) options: InterpreterOptions,
}

impl Default for Interpreter {
  fn default() -> Self {
    Self::new()
  }
}

impl Interpreter {
  /// An interpreter with the standard functions and strict kinds.
  pub fn new() -> Self {
    Self {
      functions: FunctionTable::with_builtins(),
      options: InterpreterOptions::default(),
    }
  }

  pub fn with_functions(mut self, functions: FunctionTable) -> Self {
    self.functions = functions;
    self
  }

  pub fn with_options(mut self, options: InterpreterOptions) -> Self {
    self.options = options;
    self
  }

  pub fn functions(&self) -> &FunctionTable {
    &self.functions
  }

  pub fn functions_mut(&mut self) -> &mut FunctionTable {
    &mut self.functions
  }

  pub fn options(&self) -> InterpreterOptions {
    self.options
  }
}
