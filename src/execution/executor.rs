//! Step executor - runs individual steps with the command runner and publisher

use crate::{
    actions::{self, ActionOutcome},
    core::{config::ActionKind, PipelineContext, Step, StepAction},
    publish::ReleasePublisher,
    runner::CommandRunner,
};
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info};

/// Result of executing a step
#[derive(Debug, Clone)]
pub enum ExecutionResult {
    /// Step completed successfully
    Success(ActionOutcome),
    /// Step failed; the pipeline stops here
    Failed { error: String },
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionResult::Success(_))
    }
}

/// Executes a single step
pub struct StepExecutor<R, P> {
    runner: R,
    publisher: P,
}

impl<R: CommandRunner, P: ReleasePublisher> StepExecutor<R, P> {
    pub fn new(runner: R, publisher: P) -> Self {
        Self { runner, publisher }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Execute a step and return the result
    pub async fn execute(&self, step: &Step, context: &PipelineContext) -> ExecutionResult {
        info!("Executing step: {} ({})", step.id, step.action.label());

        let timeout_duration = Duration::from_secs(step.timeout_secs);
        match timeout(timeout_duration, self.dispatch(step, context)).await {
            Ok(Ok(outcome)) => {
                debug!("Step {} output: {}", step.id, outcome.output);
                ExecutionResult::Success(outcome)
            }
            Ok(Err(e)) => {
                error!("Step {} failed: {}", step.id, e);
                ExecutionResult::Failed {
                    error: e.to_string(),
                }
            }
            Err(_) => {
                error!("Timeout for step {} after {}s", step.id, step.timeout_secs);
                ExecutionResult::Failed {
                    error: format!("Timeout after {} seconds", step.timeout_secs),
                }
            }
        }
    }

    async fn dispatch(
        &self,
        step: &Step,
        context: &PipelineContext,
    ) -> Result<ActionOutcome, actions::ActionError> {
        match &step.action {
            StepAction::Run(command) => actions::shell::run(&self.runner, step, command, context).await,
            StepAction::Builtin(kind) => match kind {
                ActionKind::Checkout => actions::checkout::run(&self.runner, step, context).await,
                ActionKind::Toolchain => actions::toolchain::run(&self.runner, step, context).await,
                ActionKind::Build => actions::build::run(&self.runner, step, context).await,
                ActionKind::PostProcess => actions::artifact::run(&self.runner, step, context).await,
                ActionKind::Publish => actions::publish::run(&self.publisher, step, context).await,
            },
        }
    }
}
