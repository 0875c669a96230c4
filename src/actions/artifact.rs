//! Post-process: strip the built binary and rename it with an architecture tag

use crate::actions::{ActionError, ActionOutcome};
use crate::core::{PipelineContext, Step};
use crate::runner::{CommandRunner, CommandSpec};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Architecture tag for the host, in the naming used for release files
pub fn host_arch_tag() -> &'static str {
    arch_tag(std::env::consts::ARCH)
}

/// Map a Rust architecture name to a release file tag
pub fn arch_tag(arch: &str) -> &str {
    match arch {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "x86" => "i386",
        "arm" => "armhf",
        other => other,
    }
}

/// Where cargo leaves a release binary
pub fn binary_path(target_dir: &Path, target: Option<&str>, binary: &str) -> PathBuf {
    let mut dir = target_dir.to_path_buf();
    if let Some(triple) = target {
        dir.push(triple);
    }
    dir.push("release");
    dir.push(binary);
    dir
}

/// Final artifact file name: `<binary><separator><arch>`
pub fn artifact_name(binary: &str, separator: &str, arch: &str) -> String {
    format!("{}{}{}", binary, separator, arch)
}

pub async fn run(
    runner: &dyn CommandRunner,
    step: &Step,
    context: &PipelineContext,
) -> Result<ActionOutcome, ActionError> {
    let binary = step
        .inputs
        .get_str("binary", context)
        .filter(|b| !b.trim().is_empty())
        .or_else(|| context.get_variable("binary").cloned())
        .filter(|b| !b.trim().is_empty())
        .ok_or_else(|| ActionError::MissingInput("binary".to_string()))?;

    let target_dir = context.resolve_path(
        step.inputs
            .get_str("target_dir", context)
            .unwrap_or_else(|| "target".to_string()),
    );
    let target = step.inputs.get_str("target", context);
    let source = binary_path(&target_dir, target.as_deref(), &binary);

    if !tokio::fs::try_exists(&source).await.unwrap_or(false) {
        return Err(ActionError::ArtifactMissing(source));
    }

    let mut log = Vec::new();

    if step.inputs.get_bool("strip", context).unwrap_or(true) {
        let program = step
            .inputs
            .get_str("strip_program", context)
            .unwrap_or_else(|| "strip".to_string());
        let spec = CommandSpec::new(program)
            .arg(source.display().to_string())
            .envs(step.render_env(context));
        info!("Stripping {}", source.display());
        runner.run(&spec).await?;
        log.push(format!("stripped {}", source.display()));
    } else {
        debug!("Stripping disabled for step {}", step.id);
    }

    let arch = step
        .inputs
        .get_str("arch", context)
        .filter(|a| !a.trim().is_empty())
        .or_else(|| context.get_variable("arch").cloned())
        .filter(|a| !a.trim().is_empty())
        .unwrap_or_else(|| host_arch_tag().to_string());
    let separator = step
        .inputs
        .get_str("separator", context)
        .unwrap_or_else(|| "_".to_string());

    let dest = source.with_file_name(artifact_name(&binary, &separator, &arch));
    tokio::fs::rename(&source, &dest)
        .await
        .map_err(|source_err| ActionError::Io {
            path: source.clone(),
            source: source_err,
        })?;
    info!("Artifact ready: {}", dest.display());
    log.push(format!("renamed {} -> {}", source.display(), dest.display()));

    Ok(ActionOutcome::new(log.join("\n"))
        .with_output("artifact", dest.display().to_string())
        .with_output("arch", arch)
        .with_artifact(dest))
}
