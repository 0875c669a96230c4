//! Build: optimized compile of every workspace member

use crate::actions::{ActionError, ActionOutcome};
use crate::core::{PipelineContext, Step};
use crate::runner::{CommandRunner, CommandSpec};
use tracing::info;

/// `cargo build` arguments for a step's inputs
pub fn cargo_args(step: &Step, context: &PipelineContext) -> Vec<String> {
    let mut args: Vec<String> = vec!["build".into(), "--release".into(), "--workspace".into()];

    if step.inputs.get_bool("all_targets", context).unwrap_or(false) {
        args.push("--all-targets".into());
    }
    if let Some(target) = step.inputs.get_str("target", context) {
        args.push("--target".into());
        args.push(target);
    }
    let features = step.inputs.get_list("features", context);
    if !features.is_empty() {
        args.push("--features".into());
        args.push(features.join(","));
    }
    if step.inputs.get_bool("locked", context).unwrap_or(false) {
        args.push("--locked".into());
    }

    args
}

pub async fn run(
    runner: &dyn CommandRunner,
    step: &Step,
    context: &PipelineContext,
) -> Result<ActionOutcome, ActionError> {
    let spec = CommandSpec::new("cargo")
        .args(cargo_args(step, context))
        .cwd(&context.workdir)
        .envs(step.render_env(context));

    info!("Building: {}", spec);
    let output = runner.run(&spec).await?;

    let target_dir = context.resolve_path("target");
    Ok(ActionOutcome::new(output.combined())
        .with_output("target_dir", target_dir.display().to_string()))
}
