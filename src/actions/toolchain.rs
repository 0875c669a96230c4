//! Toolchain: install a compiler toolchain and make it the default

use crate::actions::{ActionError, ActionOutcome};
use crate::core::{PipelineContext, Step};
use crate::runner::{CommandRunner, CommandSpec};
use tracing::info;

pub const DEFAULT_CHANNEL: &str = "stable";

/// Channel from `with.channel`, else the `toolchain` variable, else stable
pub fn channel(step: &Step, context: &PipelineContext) -> String {
    step.inputs
        .get_str("channel", context)
        .or_else(|| context.get_variable("toolchain").cloned())
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_CHANNEL.to_string())
}

pub async fn run(
    runner: &dyn CommandRunner,
    step: &Step,
    context: &PipelineContext,
) -> Result<ActionOutcome, ActionError> {
    let channel = channel(step, context);
    let env = step.render_env(context);

    let mut install = CommandSpec::new("rustup")
        .args(["toolchain", "install", channel.as_str(), "--profile", "minimal"])
        .envs(env.clone());
    for component in step.inputs.get_list("components", context) {
        install = install.args(["--component".to_string(), component]);
    }
    for target in step.inputs.get_list("targets", context) {
        install = install.args(["--target".to_string(), target]);
    }

    info!("Installing toolchain {}", channel);
    let installed = runner.run(&install).await?;

    let default = CommandSpec::new("rustup")
        .args(["default", channel.as_str()])
        .envs(env);
    let selected = runner.run(&default).await?;

    let output = [installed.combined(), selected.combined()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    Ok(ActionOutcome::new(output).with_output("toolchain", channel))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::testing::RecordingRunner;
    use crate::core::config::StepConfig;
    use crate::core::{PushEvent, StepDefaults};

    fn step(yaml: &str) -> Step {
        let config: StepConfig = serde_yaml::from_str(yaml).unwrap();
        Step::from_config(&config, &StepDefaults::default()).unwrap()
    }

    fn context() -> PipelineContext {
        PipelineContext::new(PushEvent::new("refs/heads/main"), "/work")
    }

    #[tokio::test]
    async fn test_installs_and_selects_channel() {
        let runner = RecordingRunner::default();
        let step = step("id: toolchain\nuses: toolchain\nwith:\n  channel: '1.75.0'\n  components: [clippy]\n  targets: x86_64-unknown-linux-musl\n");

        let outcome = run(&runner, &step, &context()).await.unwrap();

        assert_eq!(
            runner.commands(),
            vec![
                "rustup toolchain install 1.75.0 --profile minimal --component clippy --target x86_64-unknown-linux-musl",
                "rustup default 1.75.0",
            ]
        );
        assert_eq!(outcome.outputs.get("toolchain"), Some(&"1.75.0".to_string()));
    }

    #[test]
    fn test_channel_fallbacks() {
        let bare = step("id: toolchain\nuses: toolchain\n");
        assert_eq!(channel(&bare, &context()), "stable");

        let mut ctx = context();
        ctx.set_variable("toolchain".to_string(), "nightly".to_string());
        assert_eq!(channel(&bare, &ctx), "nightly");
    }

    #[tokio::test]
    async fn test_install_failure_stops_before_default() {
        let runner = RecordingRunner::failing("rustup");
        let step = step("id: toolchain\nuses: toolchain\n");

        let err = run(&runner, &step, &context()).await.unwrap_err();
        assert!(matches!(err, ActionError::Runner(_)));
        assert_eq!(runner.commands().len(), 1);
    }
}
