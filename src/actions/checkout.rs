//! Checkout: put the repository at the triggering revision

use crate::actions::{ActionError, ActionOutcome};
use crate::core::{PipelineContext, Step};
use crate::runner::{CommandRunner, CommandSpec};
use std::path::Path;
use tracing::info;

/// Turn `owner/name` into a clone URL; full URLs and local paths pass through
pub fn clone_url(repository: &str) -> String {
    if repository.contains("://")
        || repository.starts_with("git@")
        || repository.starts_with('/')
        || repository.starts_with('.')
    {
        repository.to_string()
    } else {
        format!("https://github.com/{}.git", repository.trim_end_matches(".git"))
    }
}

fn is_empty_or_missing(dir: &Path) -> bool {
    match std::fs::read_dir(dir) {
        Ok(mut entries) => entries.next().is_none(),
        Err(_) => true,
    }
}

pub async fn run(
    runner: &dyn CommandRunner,
    step: &Step,
    context: &PipelineContext,
) -> Result<ActionOutcome, ActionError> {
    let dir = match step.inputs.get_str("path", context) {
        Some(path) => context.resolve_path(path),
        None => context.workdir.clone(),
    };
    let dir_arg = dir.display().to_string();
    let env = step.render_env(context);
    let target = context.event.checkout_target();
    let git = |args: Vec<String>| CommandSpec::new("git").args(args).envs(env.clone());

    let mut log = Vec::new();

    if dir.join(".git").exists() {
        if step.inputs.get_bool("fetch", context).unwrap_or(true) {
            info!("Fetching into existing checkout at {}", dir_arg);
            let out = runner
                .run(&git(vec![
                    "-C".into(),
                    dir_arg.clone(),
                    "fetch".into(),
                    "--force".into(),
                    "--tags".into(),
                    "origin".into(),
                ]))
                .await?;
            log.push(out.combined());
        }
    } else {
        let repository = step
            .inputs
            .get_str("repository", context)
            .or_else(|| context.event.repository.clone())
            .ok_or(ActionError::NoRepository)?;
        let url = clone_url(&repository);

        if is_empty_or_missing(&dir) {
            info!("Cloning {} into {}", url, dir_arg);
            let out = runner
                .run(&git(vec![
                    "clone".into(),
                    "--no-checkout".into(),
                    url,
                    dir_arg.clone(),
                ]))
                .await?;
            log.push(out.combined());
        } else {
            // git refuses to clone into a non-empty directory, e.g. one
            // holding only the release definition
            info!("Initialising {} and fetching {}", dir_arg, url);
            let steps: [Vec<String>; 3] = [
                vec!["init".into(), "--quiet".into(), dir_arg.clone()],
                vec![
                    "-C".into(),
                    dir_arg.clone(),
                    "remote".into(),
                    "add".into(),
                    "origin".into(),
                    url,
                ],
                vec![
                    "-C".into(),
                    dir_arg.clone(),
                    "fetch".into(),
                    "--force".into(),
                    "--tags".into(),
                    "origin".into(),
                ],
            ];
            for args in steps {
                let out = runner.run(&git(args)).await?;
                log.push(out.combined());
            }
        }
    }

    info!("Checking out {}", target);
    let out = runner
        .run(&git(vec![
            "-C".into(),
            dir_arg.clone(),
            "checkout".into(),
            "--force".into(),
            "--detach".into(),
            target.clone(),
        ]))
        .await?;
    log.push(out.combined());

    let head = runner
        .run(&git(vec![
            "-C".into(),
            dir_arg.clone(),
            "rev-parse".into(),
            "HEAD".into(),
        ]))
        .await?;
    let sha = head.stdout.trim().to_string();

    log.retain(|line| !line.is_empty());
    log.push(format!("HEAD is now at {}", if sha.is_empty() { &target } else { &sha }));

    Ok(ActionOutcome::new(log.join("\n"))
        .with_output("sha", sha)
        .with_output("path", dir_arg))
}
