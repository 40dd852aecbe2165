//! Weft Config
//!
//! This crate contains the serializable configuration types for weft. These
//! types describe nodes and their fault-tolerance policy as they arrive from
//! the package-loading layer, plus the process-level [`Settings`] that tune
//! the interpreter and the recovery manager.
//!
//! Configuration can be loaded from:
//! - JSON files (via CLI with `--config=settings.json`)
//! - Pre-parsed JSON handed over by the workflow engine

mod enums;
mod error;
mod node;
mod settings;
mod strategy;

pub use enums::RecoveryStrategyType;
pub use error::SettingsError;
pub use node::{NodeDef, Position};
pub use settings::{RecoverySettings, ScriptSettings, Settings};
pub use strategy::{
  DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_MAX_RETRIES, DEFAULT_MAX_RETRY_DELAY_MS,
  DEFAULT_RETRY_DELAY_MS, ErrorRecoveryStrategy,
};
