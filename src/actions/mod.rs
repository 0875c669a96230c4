//! Built-in release actions
//!
//! Each action turns a step's inputs and the run context into commands for a
//! [`CommandRunner`](crate::runner::CommandRunner) or calls into a
//! [`ReleasePublisher`](crate::publish::ReleasePublisher).

pub mod artifact;
pub mod build;
pub mod checkout;
pub mod publish;
pub mod shell;
pub mod toolchain;

use crate::publish::PublishError;
use crate::runner::RunnerError;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// Error types for built-in actions
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("missing required input '{0}'")]
    MissingInput(String),

    #[error("no repository to check out: set 'with.repository' or pass --repository")]
    NoRepository,

    #[error("artifact missing: {} (did the build run?)", .0.display())]
    ArtifactMissing(PathBuf),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error(transparent)]
    Publish(#[from] PublishError),
}

/// What a successful action produced
#[derive(Debug, Clone, Default)]
pub struct ActionOutcome {
    /// Log-style summary shown to the user
    pub output: String,

    /// Named outputs, available as `steps.<id>.<name>`
    pub outputs: HashMap<String, String>,

    /// Release artifacts to register with the run
    pub artifacts: Vec<PathBuf>,
}

impl ActionOutcome {
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            ..Default::default()
        }
    }

    pub fn with_output(mut self, name: &str, value: impl Into<String>) -> Self {
        self.outputs.insert(name.to_string(), value.into());
        self
    }

    pub fn with_artifact(mut self, path: PathBuf) -> Self {
        self.artifacts.push(path);
        self
    }
}
