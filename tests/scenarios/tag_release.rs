//! Test: tag pushes build, package and publish exactly one asset

use crate::helpers::*;
use release_pipeline::core::ExecutionStatus;

#[tokio::test]
async fn test_tag_push_publishes_renamed_binary() {
    let dir = tempfile::tempdir().unwrap();
    let result = run_release(
        RELEASE_YAML,
        "refs/tags/v1.0.0",
        dir.path(),
        FakeTools::new("icalfilter"),
        RecordingPublisher::default(),
    )
    .await;

    assert_eq!(result.status, ExecutionStatus::Completed);
    for step in ["checkout", "toolchain", "build", "package", "publish"] {
        assert_completed(&result, step);
    }

    let release_dir = dir.path().join("target").join("release");
    let artifact = release_dir.join("icalfilter_amd64");
    assert!(artifact.is_file());
    assert!(!release_dir.join("icalfilter").exists());

    let requests = result.publisher().requests();
    assert_eq!(requests.len(), 1, "exactly one publish per run");
    assert_eq!(requests[0].tag, "v1.0.0");
    assert_eq!(requests[0].repository, "me/icalfilter");
    assert_eq!(requests[0].token_env, "GITHUB_TOKEN");
    assert_eq!(requests[0].files, vec![artifact.clone()]);
    assert_eq!(result.publisher().uploaded_files(), vec![artifact]);
}

#[tokio::test]
async fn test_stages_run_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let result = run_release(
        RELEASE_YAML,
        "refs/tags/v1.0.0",
        dir.path(),
        FakeTools::new("icalfilter"),
        RecordingPublisher::default(),
    )
    .await;

    assert_eq!(
        result.started_steps(),
        vec!["checkout", "toolchain", "build", "package", "publish"]
    );
    assert_eq!(
        result.tools().programs(),
        vec!["git", "git", "git", "rustup", "rustup", "cargo", "strip"]
    );

    let commands = result.tools().commands();
    assert_eq!(commands[3], "rustup toolchain install stable --profile minimal");
    assert_eq!(commands[5], "cargo build --release --workspace");
    assert_eq!(
        commands[6],
        format!("strip {}", dir.path().join("target/release/icalfilter").display())
    );
}

#[tokio::test]
async fn test_checkout_lands_on_pushed_commit() {
    let dir = tempfile::tempdir().unwrap();
    let result = run_release(
        RELEASE_YAML,
        "refs/tags/v1.0.0",
        dir.path(),
        FakeTools::new("icalfilter"),
        RecordingPublisher::default(),
    )
    .await;

    let commands = result.tools().commands();
    assert!(commands[0].ends_with("fetch --force --tags origin"));
    assert!(commands[1].ends_with(&format!("checkout --force --detach {}", FAKE_SHA)));
    assert_eq!(
        result.context.get_step_output("checkout", "sha").map(String::as_str),
        Some(FAKE_SHA)
    );
}

#[tokio::test]
async fn test_rejected_upload_fails_last_stage() {
    let dir = tempfile::tempdir().unwrap();
    let result = run_release(
        RELEASE_YAML,
        "refs/tags/v1.0.0",
        dir.path(),
        FakeTools::new("icalfilter"),
        RecordingPublisher::rejecting(),
    )
    .await;

    assert_eq!(result.status, ExecutionStatus::Failed);
    assert_eq!(result.pipeline.state.failed_stage, Some(5));
    assert_failed(&result, "publish", "422");
    assert_eq!(result.pipeline.state.outcome(), "failed at stage 5");
}
