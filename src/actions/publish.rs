//! Publish: attach release artifacts to the release for the pushed tag

use crate::actions::{ActionError, ActionOutcome};
use crate::core::{PipelineContext, Step};
use crate::publish::{PublishError, ReleasePublisher, ReleaseRequest};
use std::path::PathBuf;
use tracing::info;

pub const DEFAULT_TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Build the publish request from step inputs and the run context
pub fn request(step: &Step, context: &PipelineContext) -> Result<ReleaseRequest, ActionError> {
    let tag = context
        .event
        .git_ref
        .tag_name()
        .map(str::to_string)
        .ok_or_else(|| PublishError::NotATag(context.event.git_ref.full()))?;

    let repository = step
        .inputs
        .get_str("repository", context)
        .or_else(|| context.event.repository.clone())
        .filter(|r| !r.trim().is_empty())
        .ok_or(PublishError::MissingRepository)?;

    let listed = step.inputs.get_paths("files", context);
    let candidates: Vec<PathBuf> = if listed.is_empty() {
        context.artifacts.clone()
    } else {
        listed.iter().map(|f| context.resolve_path(f)).collect()
    };

    let mut files: Vec<PathBuf> = Vec::with_capacity(candidates.len());
    for file in candidates {
        if !files.contains(&file) {
            files.push(file);
        }
    }

    if files.is_empty() {
        return Err(PublishError::NoFiles.into());
    }
    if let Some(missing) = files.iter().find(|f| !f.is_file()) {
        return Err(PublishError::FileMissing(missing.clone()).into());
    }

    let token_env = step
        .inputs
        .get_str("token_env", context)
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_TOKEN_ENV.to_string());

    Ok(ReleaseRequest {
        repository,
        tag,
        files,
        token_env,
    })
}

pub async fn run(
    publisher: &dyn ReleasePublisher,
    step: &Step,
    context: &PipelineContext,
) -> Result<ActionOutcome, ActionError> {
    let request = request(step, context)?;
    info!(
        "Publishing {} file(s) to {} release {}",
        request.files.len(),
        request.repository,
        request.tag
    );

    let receipt = publisher.publish(&request).await?;

    let mut log: Vec<String> = receipt
        .uploaded
        .iter()
        .map(|name| {
            if receipt.replaced.contains(name) {
                format!("replaced {}", name)
            } else {
                format!("uploaded {}", name)
            }
        })
        .collect();
    if let Some(ref url) = receipt.release_url {
        log.push(format!("release: {}", url));
    }

    Ok(ActionOutcome::new(log.join("\n"))
        .with_output("release_url", receipt.release_url.clone().unwrap_or_default())
        .with_output("uploaded", receipt.uploaded.join(",")))
}
