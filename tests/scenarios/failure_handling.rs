//! Test: a failing stage stops the pipeline and nothing is published

use crate::helpers::*;
use release_pipeline::core::ExecutionStatus;
use release_pipeline::execution::ExecutionEvent;

#[tokio::test]
async fn test_compile_failure_produces_no_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let result = run_release(
        RELEASE_YAML,
        "refs/tags/v1.0.0",
        dir.path(),
        FakeTools::new("icalfilter").failing("cargo"),
        RecordingPublisher::default(),
    )
    .await;

    assert_eq!(result.status, ExecutionStatus::Failed);
    assert_eq!(result.pipeline.state.failed_stage, Some(3));
    assert_eq!(result.pipeline.state.failed_step.as_deref(), Some("build"));
    assert_failed(&result, "build", "could not compile");
    assert_skipped(&result, "package", "an earlier step failed");
    assert_skipped(&result, "publish", "an earlier step failed");

    assert!(!result.tools().programs().contains(&"strip".to_string()));
    assert!(result.publisher().requests().is_empty());
    assert!(result.context.artifacts.is_empty());
    assert!(!dir.path().join("target/release/icalfilter_amd64").exists());
}

#[tokio::test]
async fn test_toolchain_failure_stops_before_build() {
    let dir = tempfile::tempdir().unwrap();
    let result = run_release(
        RELEASE_YAML,
        "refs/heads/main",
        dir.path(),
        FakeTools::new("icalfilter").failing("rustup"),
        RecordingPublisher::default(),
    )
    .await;

    assert_eq!(result.pipeline.state.outcome(), "failed at stage 2");
    assert_completed(&result, "checkout");
    assert_failed(&result, "toolchain", "exited with code 101");
    assert_eq!(result.tools().programs(), vec!["git", "git", "git", "rustup"]);
}

#[tokio::test]
async fn test_strip_failure_leaves_original_binary() {
    let dir = tempfile::tempdir().unwrap();
    let result = run_release(
        RELEASE_YAML,
        "refs/tags/v1.0.0",
        dir.path(),
        FakeTools::new("icalfilter").failing("strip"),
        RecordingPublisher::default(),
    )
    .await;

    assert_eq!(result.pipeline.state.failed_stage, Some(4));
    assert_failed(&result, "package", "strip");
    assert!(dir.path().join("target/release/icalfilter").is_file());
    assert!(result.publisher().requests().is_empty());
}

#[tokio::test]
async fn test_wrong_binary_name_fails_packaging() {
    let dir = tempfile::tempdir().unwrap();
    let result = run_release(
        RELEASE_YAML,
        "refs/tags/v1.0.0",
        dir.path(),
        FakeTools::new("something-else"),
        RecordingPublisher::default(),
    )
    .await;

    assert_eq!(result.pipeline.state.failed_stage, Some(4));
    assert_failed(&result, "package", "artifact missing");
    assert!(result.publisher().requests().is_empty());
}

#[tokio::test]
async fn test_every_step_ends_terminal_and_events_close_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let result = run_release(
        RELEASE_YAML,
        "refs/tags/v1.0.0",
        dir.path(),
        FakeTools::new("icalfilter").failing("cargo"),
        RecordingPublisher::default(),
    )
    .await;

    assert!(result.pipeline.steps.iter().all(|s| s.state.is_terminal()));

    let failures = result
        .events
        .iter()
        .filter(|e| matches!(e, ExecutionEvent::StepFailed { .. }))
        .count();
    assert_eq!(failures, 1);
    assert!(matches!(
        result.events.last(),
        Some(ExecutionEvent::PipelineCompleted {
            status: ExecutionStatus::Failed,
            ..
        })
    ));
}
