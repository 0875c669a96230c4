//! Test: variables, event fields and step outputs render into later steps

use crate::helpers::*;
use release_pipeline::core::ExecutionStatus;

const YAML: &str = r#"
name: "cross-release"
variables:
  binary: "tool"
  arch: "arm64"
  features: "cli,tz"
steps:
  - id: checkout
    uses: checkout
  - id: build
    uses: build
    with:
      features: "{{ features }}"
      locked: true
  - id: package
    uses: post-process
    with:
      strip: false
  - id: announce
    run: "echo {{ steps.package.artifact }} {{ ref_name }} {{ github.sha }}"
    env:
      RELEASE_TAG: "{{ ref_name }}"
"#;

#[tokio::test]
async fn test_outputs_and_variables_flow_into_commands() {
    let dir = tempfile::tempdir().unwrap();
    let result = run_release(
        YAML,
        "refs/tags/v3.1.0",
        dir.path(),
        FakeTools::new("tool"),
        RecordingPublisher::default(),
    )
    .await;

    assert_eq!(result.status, ExecutionStatus::Completed);

    let commands = result.tools().commands();
    assert!(commands.contains(&"cargo build --release --workspace --features cli,tz --locked".to_string()));

    let artifact = dir.path().join("target/release/tool_arm64");
    assert!(artifact.is_file());
    assert_eq!(
        commands.last().cloned(),
        Some(format!(
            "sh -c 'echo {} v3.1.0 {}'",
            artifact.display(),
            FAKE_SHA
        ))
    );
}

#[tokio::test]
async fn test_step_env_is_rendered() {
    let dir = tempfile::tempdir().unwrap();
    let result = run_release(
        YAML,
        "refs/tags/v3.1.0",
        dir.path(),
        FakeTools::new("tool"),
        RecordingPublisher::default(),
    )
    .await;

    assert_completed(&result, "announce");
    let announce = result.tools().specs().pop().unwrap();
    assert_eq!(announce.program, "sh");
    assert_eq!(announce.env.get("RELEASE_TAG").map(String::as_str), Some("v3.1.0"));
    assert_eq!(announce.cwd.as_deref(), Some(dir.path()));
    assert_eq!(
        result.context.get_step_output("package", "arch").map(String::as_str),
        Some("arm64")
    );
    assert_eq!(result.context.artifacts, vec![dir.path().join("target/release/tool_arm64")]);
}
