//! release-pipeline - runs a push-triggered release pipeline: checkout,
//! toolchain install, optimized build, strip and rename, publish on tags.

pub mod actions;
pub mod cli;
pub mod core;
pub mod execution;
pub mod persistence;
pub mod publish;
pub mod runner;

// Re-export commonly used types
pub use core::{ExecutionStatus, Pipeline, PipelineContext, PushEvent, Step, StepState};
pub use execution::{ExecutionEngine, ExecutionEvent};
pub use publish::{GithubConfig, GithubPublisher, PublishError, ReleasePublisher, ReleaseRequest};
pub use runner::{CommandOutput, CommandRunner, CommandSpec, ProcessRunner, RunnerError};
