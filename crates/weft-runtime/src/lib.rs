//! Node execution for weft.
//!
//! [`NodeRuntime::execute_node`] dispatches a node to the executor registered
//! for its type and, when the execution fails, applies the node's recovery
//! strategy through the shared
//! [`ErrorRecoveryManager`](weft_recovery::ErrorRecoveryManager).

mod error;
mod registry;
mod runtime;
mod script;

pub use error::RuntimeError;
pub use registry::ExecutorRegistry;
pub use runtime::NodeRuntime;
pub use script::{SCRIPT_NODE_TYPE, ScriptExecutor};
