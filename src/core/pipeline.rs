//! Pipeline domain model

use crate::core::{
    config::{PipelineConfig, TriggerEvent},
    context::PipelineContext,
    state::{PipelineState, StepState},
    step::{Step, StepDefaults},
    trigger::PushEvent,
};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::PathBuf;

/// A pipeline definition with runtime state
#[derive(Debug, Clone)]
pub struct Pipeline {
    /// Pipeline name
    pub name: String,

    /// Global variables available to all steps
    pub variables: HashMap<String, String>,

    /// Events that start this pipeline
    pub triggers: Vec<TriggerEvent>,

    /// Steps in execution order
    pub steps: Vec<Step>,

    /// Execution state
    pub state: PipelineState,
}

impl Pipeline {
    /// Create a pipeline from configuration
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let defaults = StepDefaults {
            timeout_secs: config
                .default_timeout_secs
                .unwrap_or(StepDefaults::default().timeout_secs),
        };

        let steps = config
            .steps
            .iter()
            .map(|step_config| {
                Step::from_config(step_config, &defaults)
                    .with_context(|| format!("Invalid step '{}'", step_config.id))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Pipeline {
            name: config.name.clone(),
            variables: config.variables_as_string_map(),
            triggers: config.triggers.clone(),
            steps,
            state: PipelineState::new(),
        })
    }

    /// Get a step by ID
    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Get a mutable step by ID
    pub fn step_mut(&mut self, id: &str) -> Option<&mut Step> {
        self.steps.iter_mut().find(|s| s.id == id)
    }

    /// Step IDs in execution order
    pub fn execution_order(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.id.clone()).collect()
    }

    /// Whether a push event starts this pipeline
    pub fn is_triggered_by(&self, _event: &PushEvent) -> bool {
        self.triggers.contains(&TriggerEvent::Push)
    }

    /// Check if every step reached a terminal state
    pub fn is_complete(&self) -> bool {
        self.steps.iter().all(|s| s.state.is_terminal())
    }

    /// Create the run context for an event
    pub fn create_context(&self, event: PushEvent, workdir: impl Into<PathBuf>) -> PipelineContext {
        let mut context = PipelineContext::new(event, workdir);
        context.variables.extend(self.variables.clone());
        context
    }

    /// Recount completed and skipped steps
    pub fn update_counts(&mut self) {
        self.state.completed_steps = self
            .steps
            .iter()
            .filter(|s| matches!(s.state, StepState::Completed { .. }))
            .count();
        self.state.skipped_steps = self
            .steps
            .iter()
            .filter(|s| matches!(s.state, StepState::Skipped { .. }))
            .count();
    }

    /// Which steps would run for an event, without executing anything.
    ///
    /// Conditions that reference step outputs see them as empty.
    pub fn plan(&self, event: &PushEvent) -> Vec<PlannedStep> {
        let context = self.create_context(event.clone(), ".");
        self.steps
            .iter()
            .map(|step| PlannedStep {
                id: step.id.clone(),
                name: step.name.clone(),
                action: step.action.label(),
                condition: step.condition.as_ref().map(|c| c.source().to_string()),
                runs: step.should_run(&context),
            })
            .collect()
    }
}

/// One line of a dry plan
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PlannedStep {
    pub id: String,
    pub name: String,
    pub action: String,
    pub condition: Option<String>,
    pub runs: bool,
}
