//! Subprocess command runner

use crate::runner::{CommandOutput, CommandRunner, CommandSpec, RunnerError};
use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Runs commands as child processes and captures their output
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    /// Spawn `spec.program` with its arguments and wait for it.
    ///
    /// # Errors
    /// Returns `RunnerError` if:
    /// - The program cannot be spawned
    /// - It exits with a non-zero status
    /// - It runs past `spec.timeout` (the child is killed)
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, RunnerError> {
        debug!("Running: {}", spec);

        let mut command = Command::new(&spec.program);
        command.args(&spec.args).envs(&spec.env).kill_on_drop(true);
        if let Some(cwd) = &spec.cwd {
            command.current_dir(cwd);
        }

        let output = match spec.timeout {
            Some(limit) => timeout(limit, command.output())
                .await
                .map_err(|_| RunnerError::Timeout {
                    command: spec.to_string(),
                    secs: limit.as_secs(),
                })?,
            None => command.output().await,
        }
        .map_err(|source| RunnerError::Spawn {
            program: spec.program.clone(),
            source,
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            warn!("{} exited with code {}: {}", spec.program, code, stderr.trim());
            return Err(RunnerError::ExitStatus {
                command: spec.to_string(),
                code,
                stderr: stderr.trim().to_string(),
            });
        }

        debug!("{} returned {} bytes of output", spec.program, stdout.len());

        Ok(CommandOutput { stdout, stderr })
    }
}
