//! Main execution engine - orchestrates the entire pipeline run

use crate::{
    core::{ExecutionStatus, Pipeline, PipelineContext, StepState},
    execution::{ExecutionResult, StepExecutor},
    publish::ReleasePublisher,
    runner::CommandRunner,
};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};
use uuid::Uuid;

/// Reason recorded for steps that never ran because of an earlier failure
pub const SKIPPED_AFTER_FAILURE: &str = "an earlier step failed";

/// Reason recorded for steps whose `if:` was false
pub const SKIPPED_BY_CONDITION: &str = "condition not met";

/// Events that can occur during pipeline execution
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    PipelineStarted {
        execution_id: Uuid,
        pipeline_name: String,
    },
    StepStarted {
        step_id: String,
        /// 1-based stage number
        index: usize,
        total: usize,
    },
    StepOutput {
        step_id: String,
        output: String,
    },
    StepCompleted {
        step_id: String,
    },
    StepSkipped {
        step_id: String,
        reason: String,
    },
    StepFailed {
        step_id: String,
        error: String,
    },
    PipelineCompleted {
        execution_id: Uuid,
        status: ExecutionStatus,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(ExecutionEvent) + Send + Sync>;

/// Main pipeline execution engine
pub struct ExecutionEngine<R, P> {
    executor: StepExecutor<R, P>,
    event_handlers: Mutex<Vec<EventHandler>>,
}

impl<R: CommandRunner, P: ReleasePublisher> ExecutionEngine<R, P> {
    pub fn new(runner: R, publisher: P) -> Self {
        Self {
            executor: StepExecutor::new(runner, publisher),
            event_handlers: Mutex::new(Vec::new()),
        }
    }

    pub fn executor(&self) -> &StepExecutor<R, P> {
        &self.executor
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&self, handler: F)
    where
        F: Fn(ExecutionEvent) + Send + Sync + 'static,
    {
        if let Ok(mut handlers) = self.event_handlers.lock() {
            handlers.push(Arc::new(handler));
        }
    }

    /// Emit an event to all handlers
    fn emit_event(&self, event: ExecutionEvent) {
        let handlers = match self.event_handlers.lock() {
            Ok(handlers) => handlers.clone(),
            Err(_) => return,
        };
        for handler in handlers.iter() {
            handler(event.clone());
        }
    }

    /// Execute the entire pipeline.
    ///
    /// Steps run strictly in declaration order. A step whose condition is
    /// false is skipped; once a step fails, every later step is skipped and
    /// the run is recorded as failed at that stage.
    pub async fn execute(
        &self,
        pipeline: &mut Pipeline,
        context: &mut PipelineContext,
    ) -> ExecutionStatus {
        let execution_id = pipeline.state.execution_id;
        let total = pipeline.steps.len();

        info!(
            "Starting pipeline execution: {} ({}) for {}",
            pipeline.name, execution_id, context.event.git_ref
        );
        self.emit_event(ExecutionEvent::PipelineStarted {
            execution_id,
            pipeline_name: pipeline.name.clone(),
        });

        pipeline.state.start(total);
        let mut failure: Option<(usize, String)> = None;

        for index in 0..total {
            let stage = index + 1;
            let step = pipeline.steps[index].clone();

            if failure.is_some() {
                self.mark_step_skipped(pipeline, index, SKIPPED_AFTER_FAILURE);
                continue;
            }

            context.current_step_id = Some(step.id.clone());

            if !step.should_run(context) {
                info!("Skipping step {}: {}", step.id, SKIPPED_BY_CONDITION);
                self.mark_step_skipped(pipeline, index, SKIPPED_BY_CONDITION);
                continue;
            }

            let started_at = chrono::Utc::now();
            pipeline.steps[index].state = StepState::Running { started_at };
            self.emit_event(ExecutionEvent::StepStarted {
                step_id: step.id.clone(),
                index: stage,
                total,
            });

            match self.executor.execute(&step, context).await {
                ExecutionResult::Success(outcome) => {
                    if !outcome.output.is_empty() {
                        self.emit_event(ExecutionEvent::StepOutput {
                            step_id: step.id.clone(),
                            output: outcome.output.clone(),
                        });
                    }

                    context.set_step_outputs(&step.id, outcome.outputs);
                    for artifact in outcome.artifacts {
                        context.add_artifact(artifact);
                    }

                    pipeline.steps[index].state = StepState::Completed {
                        output: outcome.output,
                        started_at,
                        completed_at: chrono::Utc::now(),
                    };
                    info!("Step {} completed ({}/{})", step.id, stage, total);
                    self.emit_event(ExecutionEvent::StepCompleted {
                        step_id: step.id.clone(),
                    });
                }
                ExecutionResult::Failed { error } => {
                    warn!("Step {} failed at stage {}: {}", step.id, stage, error);
                    pipeline.steps[index].state = StepState::Failed {
                        error: error.clone(),
                        started_at,
                        failed_at: chrono::Utc::now(),
                    };
                    self.emit_event(ExecutionEvent::StepFailed {
                        step_id: step.id.clone(),
                        error,
                    });
                    failure = Some((stage, step.id.clone()));
                }
            }

            pipeline.update_counts();
        }

        context.current_step_id = None;
        pipeline.update_counts();

        let status = match failure {
            Some((stage, step_id)) => {
                pipeline.state.fail(stage, &step_id);
                ExecutionStatus::Failed
            }
            None => {
                pipeline.state.complete();
                ExecutionStatus::Completed
            }
        };

        info!(
            "Pipeline execution finished: {} - {}",
            pipeline.name,
            pipeline.state.outcome()
        );
        self.emit_event(ExecutionEvent::PipelineCompleted {
            execution_id,
            status,
        });

        status
    }

    fn mark_step_skipped(&self, pipeline: &mut Pipeline, index: usize, reason: &str) {
        let step = &mut pipeline.steps[index];
        step.state = StepState::Skipped {
            reason: reason.to_string(),
        };
        self.emit_event(ExecutionEvent::StepSkipped {
            step_id: step.id.clone(),
            reason: reason.to_string(),
        });
    }
}
