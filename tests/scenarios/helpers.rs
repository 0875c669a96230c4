//! Test utility functions for release scenarios

use async_trait::async_trait;
use release_pipeline::core::config::PipelineConfig;
use release_pipeline::core::{ExecutionStatus, Pipeline, PipelineContext, PushEvent, StepState};
use release_pipeline::execution::{ExecutionEngine, ExecutionEvent};
use release_pipeline::publish::{PublishError, PublishReceipt, ReleasePublisher, ReleaseRequest};
use release_pipeline::runner::{CommandOutput, CommandRunner, CommandSpec, RunnerError};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub const FAKE_SHA: &str = "0123456789abcdef0123456789abcdef01234567";

/// The release definition shipped at the repository root
pub const RELEASE_YAML: &str = include_str!("../../release.yaml");

/// Command runner that records every command and fakes the tools.
///
/// `cargo build` leaves a binary under `<cwd>/target/release/<binary>`,
/// `git rev-parse` answers with [`FAKE_SHA`], everything else succeeds silently.
pub struct FakeTools {
    calls: Mutex<Vec<CommandSpec>>,
    binary: String,
    fail_program: Option<String>,
}

impl FakeTools {
    pub fn new(binary: &str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            binary: binary.to_string(),
            fail_program: None,
        }
    }

    /// Make every invocation of `program` exit non-zero
    pub fn failing(mut self, program: &str) -> Self {
        self.fail_program = Some(program.to_string());
        self
    }

    pub fn programs(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.program.clone())
            .collect()
    }

    pub fn specs(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|c| c.to_string()).collect()
    }
}

#[async_trait]
impl CommandRunner for FakeTools {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, RunnerError> {
        self.calls.lock().unwrap().push(spec.clone());

        if self.fail_program.as_deref() == Some(spec.program.as_str()) {
            return Err(RunnerError::ExitStatus {
                command: spec.to_string(),
                code: 101,
                stderr: "error: could not compile `icalfilter`".to_string(),
            });
        }

        match spec.program.as_str() {
            "cargo" => {
                let cwd = spec.cwd.clone().unwrap_or_else(|| PathBuf::from("."));
                let release = cwd.join("target").join("release");
                std::fs::create_dir_all(&release).unwrap();
                std::fs::write(release.join(&self.binary), b"\x7fELF unstripped").unwrap();
                Ok(CommandOutput::new("Finished `release` profile [optimized]"))
            }
            "git" if spec.args.iter().any(|a| a == "rev-parse") => {
                Ok(CommandOutput::new(format!("{}\n", FAKE_SHA)))
            }
            _ => Ok(CommandOutput::default()),
        }
    }
}

/// Publisher that records requests and checks the files exist at upload time
#[derive(Default)]
pub struct RecordingPublisher {
    requests: Mutex<Vec<ReleaseRequest>>,
    reject: bool,
}

impl RecordingPublisher {
    pub fn rejecting() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            reject: true,
        }
    }

    pub fn requests(&self) -> Vec<ReleaseRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn uploaded_files(&self) -> Vec<PathBuf> {
        self.requests().into_iter().flat_map(|r| r.files).collect()
    }
}

#[async_trait]
impl ReleasePublisher for RecordingPublisher {
    async fn publish(&self, request: &ReleaseRequest) -> Result<PublishReceipt, PublishError> {
        self.requests.lock().unwrap().push(request.clone());

        if self.reject {
            return Err(PublishError::Api {
                status: 422,
                message: "Validation Failed".to_string(),
            });
        }

        for file in &request.files {
            if !file.is_file() {
                return Err(PublishError::FileMissing(file.clone()));
            }
        }

        Ok(PublishReceipt {
            release_url: Some(format!(
                "https://github.com/{}/releases/tag/{}",
                request.repository, request.tag
            )),
            uploaded: request
                .files
                .iter()
                .filter_map(|f| f.file_name().map(|n| n.to_string_lossy().into_owned()))
                .collect(),
            replaced: Vec::new(),
        })
    }
}

/// Everything a scenario might want to look at after a run
pub struct ReleaseTestResult {
    pub status: ExecutionStatus,
    pub pipeline: Pipeline,
    pub context: PipelineContext,
    pub engine: ExecutionEngine<FakeTools, RecordingPublisher>,
    pub events: Vec<ExecutionEvent>,
}

impl ReleaseTestResult {
    pub fn tools(&self) -> &FakeTools {
        self.engine.executor().runner()
    }

    pub fn publisher(&self) -> &RecordingPublisher {
        self.engine.executor().publisher()
    }

    pub fn state(&self, step_id: &str) -> &StepState {
        &self
            .pipeline
            .step(step_id)
            .unwrap_or_else(|| panic!("Step '{}' not found in result", step_id))
            .state
    }

    pub fn started_steps(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ExecutionEvent::StepStarted { step_id, .. } => Some(step_id.clone()),
                _ => None,
            })
            .collect()
    }
}

pub fn pipeline_from_yaml(yaml: &str) -> Pipeline {
    PipelineConfig::from_yaml(yaml)
        .expect("pipeline YAML should parse")
        .to_pipeline()
        .expect("pipeline should build")
}

/// Run `yaml` for a push to `git_ref` inside `workdir`
pub async fn run_release(
    yaml: &str,
    git_ref: &str,
    workdir: &Path,
    tools: FakeTools,
    publisher: RecordingPublisher,
) -> ReleaseTestResult {
    let mut pipeline = pipeline_from_yaml(yaml);
    let event = PushEvent::new(git_ref)
        .with_sha(FAKE_SHA)
        .with_repository("me/icalfilter");
    let mut context = pipeline.create_context(event, workdir);

    // Pretend the checkout already exists so `git clone` is not needed
    std::fs::create_dir_all(workdir.join(".git")).unwrap();

    let engine = ExecutionEngine::new(tools, publisher);
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    engine.add_event_handler(move |event| sink.lock().unwrap().push(event));

    let status = engine.execute(&mut pipeline, &mut context).await;
    let events = events.lock().unwrap().clone();

    ReleaseTestResult {
        status,
        pipeline,
        context,
        engine,
        events,
    }
}

/// Assert a step completed
pub fn assert_completed(result: &ReleaseTestResult, step_id: &str) {
    let state = result.state(step_id);
    assert!(
        matches!(state, StepState::Completed { .. }),
        "Step '{}' should be completed, but was in state: {:?}",
        step_id,
        state
    );
}

/// Assert a step was skipped with a reason containing `reason`
pub fn assert_skipped(result: &ReleaseTestResult, step_id: &str, reason: &str) {
    match result.state(step_id) {
        StepState::Skipped { reason: actual } => assert!(
            actual.contains(reason),
            "Step '{}' skipped for '{}', expected '{}'",
            step_id,
            actual,
            reason
        ),
        other => panic!("Step '{}' should be skipped, but was in state: {:?}", step_id, other),
    }
}

/// Assert a step failed with an error containing `expected_error`
pub fn assert_failed(result: &ReleaseTestResult, step_id: &str, expected_error: &str) {
    match result.state(step_id) {
        StepState::Failed { error, .. } => assert!(
            error.contains(expected_error),
            "Step '{}' error:\n{}\n\ndoes not contain:\n{}",
            step_id,
            error,
            expected_error
        ),
        other => panic!("Step '{}' should have failed, but was in state: {:?}", step_id, other),
    }
}
