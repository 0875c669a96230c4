//! Pipeline execution engine

pub mod engine;
pub mod executor;

pub use engine::{ExecutionEngine, ExecutionEvent, SKIPPED_AFTER_FAILURE, SKIPPED_BY_CONDITION};
pub use executor::{ExecutionResult, StepExecutor};
