//! `run:` steps - arbitrary shell commands

use crate::actions::{ActionError, ActionOutcome};
use crate::core::{PipelineContext, Step};
use crate::runner::{CommandRunner, CommandSpec};
use tracing::debug;

pub async fn run(
    runner: &dyn CommandRunner,
    step: &Step,
    command: &str,
    context: &PipelineContext,
) -> Result<ActionOutcome, ActionError> {
    let rendered = context.render(command);
    debug!("Step {} running shell command: {}", step.id, rendered);

    let spec = CommandSpec::new("sh")
        .args(["-c".to_string(), rendered])
        .cwd(&context.workdir)
        .envs(step.render_env(context));

    let output = runner.run(&spec).await?;
    Ok(ActionOutcome::new(output.combined()))
}
