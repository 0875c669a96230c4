//! Test: invalid definitions are rejected before anything runs

use crate::helpers::*;
use release_pipeline::core::config::PipelineConfig;

fn rejection(yaml: &str) -> String {
    match PipelineConfig::from_yaml(yaml) {
        Ok(config) => panic!("'{}' should have been rejected", config.name),
        Err(e) => format!("{:#}", e),
    }
}

#[test]
fn test_shipped_release_definition_is_valid() {
    let config = PipelineConfig::from_yaml(RELEASE_YAML).unwrap();
    assert_eq!(config.name, "icalfilter-release");
    assert_eq!(config.steps.len(), 5);
    assert!(config.to_pipeline().is_ok());
}

#[test]
fn test_duplicate_step_ids() {
    let err = rejection(
        r#"
name: "dup"
steps:
  - id: build
    uses: build
  - id: build
    run: "echo again"
"#,
    );
    assert!(err.contains("Duplicate step ID: build"), "{}", err);
}

#[test]
fn test_uses_and_run_are_exclusive() {
    let both = rejection(
        r#"
name: "both"
steps:
  - id: build
    uses: build
    run: "cargo build"
"#,
    );
    assert!(both.contains("both 'uses' and 'run'"), "{}", both);

    let neither = rejection(
        r#"
name: "neither"
steps:
  - id: build
"#,
    );
    assert!(neither.contains("needs either 'uses' or 'run'"), "{}", neither);
}

#[test]
fn test_unparsable_condition() {
    let err = rejection(
        r#"
name: "bad-if"
steps:
  - id: publish
    uses: publish
    if: "startsWith(github.ref, 'refs/tags/'"
"#,
    );
    assert!(err.contains("invalid condition"), "{}", err);
}

#[test]
fn test_unknown_function_in_condition() {
    let err = rejection(
        r#"
name: "bad-fn"
steps:
  - id: publish
    uses: publish
    if: "matches(github.ref, 'v*')"
"#,
    );
    assert!(err.contains("publish"), "{}", err);
}

#[test]
fn test_unknown_action() {
    let err = rejection(
        r#"
name: "deploy"
steps:
  - id: deploy
    uses: deploy
"#,
    );
    assert!(err.contains("Invalid pipeline YAML"), "{}", err);
}

#[test]
fn test_zero_timeout() {
    let err = rejection(
        r#"
name: "timeout"
steps:
  - id: build
    uses: build
    timeout_secs: 0
"#,
    );
    assert!(err.contains("greater than zero"), "{}", err);
}
