//! Nodes whose logic is a declarative script.
//!
//! ```json
//! {
//!   "id": "greet",
//!   "type": "script",
//!   "config": {
//!     "script": "greetings",
//!     "function": "hello",
//!     "args": ["$ref:data.user.name", "!"]
//!   }
//! }
//! ```
//!
//! `script` is either an inline definition or the name of an entry in the
//! context's `scripts`. `args` are `$ref:` strings resolved against
//! `{data, user, state, config}`, or literal values.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, instrument};
use weft_config::ScriptSettings;
use weft_script::{Interpreter, InterpreterOptions, ScriptDefinition, ScriptError};
use weft_workflow::{
  ExecutionState, NodeError, NodeExecutor, NodeResult, WorkflowContext, WorkflowNode,
};

pub const SCRIPT_NODE_TYPE: &str = "script";

const DEFAULT_FUNCTION: &str = "main";

/// Runs a function of a script definition through the interpreter.
#[derive(Debug, Clone)]
pub struct ScriptExecutor {
  interpreter: Arc<Interpreter>,
}

impl Default for ScriptExecutor {
  fn default() -> Self {
    Self::new(Interpreter::new())
  }
}

impl ScriptExecutor {
  pub fn new(interpreter: Interpreter) -> Self {
    Self {
      interpreter: Arc::new(interpreter),
    }
  }

  pub fn from_settings(settings: &ScriptSettings) -> Self {
    Self::new(Interpreter::new().with_options(InterpreterOptions {
      strict_kinds: settings.strict_kinds,
    }))
  }

  pub fn interpreter(&self) -> &Interpreter {
    &self.interpreter
  }
}

#[async_trait]
impl NodeExecutor for ScriptExecutor {
  #[instrument(
    name = "script_execute",
    skip(self, node, context, state),
    fields(node_id = %node.id, execution_id = %context.execution_id)
  )]
  async fn execute(
    &self,
    node: &WorkflowNode,
    context: &WorkflowContext,
    state: &ExecutionState,
  ) -> Result<NodeResult, NodeError> {
    let definition = load_definition(node, context)?;
    let function = node
      .config
      .get("function")
      .and_then(Value::as_str)
      .unwrap_or(DEFAULT_FUNCTION);
    let args = resolve_args(node, context, state);

    debug!(function, args = args.len(), "running script function");
    let output = self
      .interpreter
      .run_function(&definition, function, &args)
      .map_err(into_node_error)?;

    Ok(NodeResult::success(output.unwrap_or(Value::Null)))
  }
}

fn load_definition(
  node: &WorkflowNode,
  context: &WorkflowContext,
) -> Result<ScriptDefinition, NodeError> {
  let source = match node.config.get("script") {
    Some(Value::String(name)) => context.scripts.get(name).ok_or_else(|| {
      NodeError::configuration(
        "ScriptNotFound",
        format!("script '{}' is not defined in the workflow context", name),
      )
    })?,
    Some(inline @ Value::Object(_)) => inline,
    _ => {
      return Err(NodeError::configuration(
        "InvalidNodeConfig",
        "config.script must be a script definition or the name of one",
      ));
    }
  };

  ScriptDefinition::from_value(source.clone()).map_err(into_node_error)
}

fn resolve_args(node: &WorkflowNode, context: &WorkflowContext, state: &ExecutionState) -> Vec<Value> {
  let Some(args) = node.config.get("args").and_then(Value::as_array) else {
    return Vec::new();
  };

  let scope = json!({
    "data": context.data,
    "user": context.user,
    "state": state.to_value(),
    "config": node.config,
  });

  args
    .iter()
    .map(|arg| weft_script::resolve(arg, &scope).unwrap_or(Value::Null))
    .collect()
}

fn into_node_error(err: ScriptError) -> NodeError {
  let kind = err.kind().to_string();
  match &err {
    ScriptError::Thrown { message, .. } => NodeError::new(kind, message.clone()),
    other => NodeError::configuration(kind, other.to_string()),
  }
}
