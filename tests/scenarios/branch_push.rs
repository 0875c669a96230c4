//! Test: non-tag pushes build but never publish

use crate::helpers::*;
use release_pipeline::core::{ExecutionStatus, PushEvent};

#[tokio::test]
async fn test_branch_push_skips_publish() {
    let dir = tempfile::tempdir().unwrap();
    let result = run_release(
        RELEASE_YAML,
        "refs/heads/main",
        dir.path(),
        FakeTools::new("icalfilter"),
        RecordingPublisher::default(),
    )
    .await;

    assert_eq!(result.status, ExecutionStatus::Completed);
    assert_skipped(&result, "publish", "condition not met");
    assert!(result.publisher().requests().is_empty());
    assert_eq!(result.pipeline.state.completed_steps, 4);
    assert_eq!(result.pipeline.state.skipped_steps, 1);

    // The binary is still built and packaged
    assert!(dir.path().join("target/release/icalfilter_amd64").is_file());
}

#[tokio::test]
async fn test_checkout_and_toolchain_run_for_every_push() {
    for git_ref in ["refs/heads/main", "refs/tags/v2.0.0", "refs/pull/7/merge", "feature/x"] {
        let dir = tempfile::tempdir().unwrap();
        let result = run_release(
            RELEASE_YAML,
            git_ref,
            dir.path(),
            FakeTools::new("icalfilter"),
            RecordingPublisher::default(),
        )
        .await;

        assert_completed(&result, "checkout");
        assert_completed(&result, "toolchain");

        let tagged = git_ref.starts_with("refs/tags/");
        assert_eq!(
            result.publisher().requests().len(),
            usize::from(tagged),
            "publish count for {}",
            git_ref
        );
    }
}

#[test]
fn test_plan_matches_ref_kind() {
    let pipeline = pipeline_from_yaml(RELEASE_YAML);

    let branch = pipeline.plan(&PushEvent::new("refs/heads/main"));
    assert_eq!(branch.len(), 5);
    assert!(branch[..4].iter().all(|s| s.runs));
    assert!(!branch[4].runs);

    let tag = pipeline.plan(&PushEvent::new("refs/tags/v1.0.0"));
    assert!(tag.iter().all(|s| s.runs));
    assert_eq!(
        tag[4].condition.as_deref(),
        Some("startsWith(github.ref, 'refs/tags/')")
    );
}

#[tokio::test]
async fn test_lookalike_branch_is_not_a_tag() {
    let dir = tempfile::tempdir().unwrap();
    let result = run_release(
        RELEASE_YAML,
        "refs/heads/refs/tags/v1",
        dir.path(),
        FakeTools::new("icalfilter"),
        RecordingPublisher::default(),
    )
    .await;

    assert_skipped(&result, "publish", "condition not met");
    assert!(result.publisher().requests().is_empty());
}
