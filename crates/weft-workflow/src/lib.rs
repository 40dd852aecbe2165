//! Weft Workflow
//!
//! This crate provides the types shared with the graph-level workflow engine.
//! The engine owns traversal and edge wiring; weft only sees one node at a
//! time, together with the execution context and state the engine passes
//! through unmodified.
//!
//! The [`NodeExecutor`] trait is implemented by concrete node kinds (script,
//! Lua, HTTP, ...) and [`NodeDispatcher`] is the single channel through which
//! the recovery manager re-invokes them.

mod context;
mod error;
mod executor;
mod result;

pub use context::{ExecutionState, WorkflowContext};
pub use error::NodeError;
pub use executor::{NodeDispatcher, NodeExecutor};
pub use result::{NodeResult, NodeStatus};

/// A node as handed over by the engine.
pub type WorkflowNode = weft_config::NodeDef;
