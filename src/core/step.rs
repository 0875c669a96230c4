//! Step domain model

use crate::core::{
    condition::{Condition, ConditionError},
    config::{ActionKind, StepConfig},
    context::{has_placeholder, PipelineContext},
    state::StepState,
};
use serde_yaml::Value;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// What a step does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAction {
    /// A built-in release action
    Builtin(ActionKind),
    /// A shell command
    Run(String),
}

impl StepAction {
    pub fn label(&self) -> String {
        match self {
            StepAction::Builtin(kind) => kind.as_str().to_string(),
            StepAction::Run(_) => "run".to_string(),
        }
    }
}

/// Action inputs (`with:`) with typed accessors
#[derive(Debug, Clone, Default)]
pub struct StepInputs {
    values: BTreeMap<String, Value>,
}

impl StepInputs {
    pub fn new(values: BTreeMap<String, Value>) -> Self {
        Self { values }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// String input, rendered against the context. Numbers and booleans are stringified.
    ///
    /// A value that references an unset variable counts as absent, so callers
    /// fall back to their defaults.
    pub fn get_str(&self, key: &str, context: &PipelineContext) -> Option<String> {
        let raw = match self.values.get(key)? {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => return None,
        };
        let rendered = context.render(&raw);
        if has_placeholder(&rendered) {
            debug!("Input '{}' references an unset variable: {}", key, raw);
            return None;
        }
        Some(rendered)
    }

    /// Boolean input; accepts YAML booleans and "true"/"false" strings
    pub fn get_bool(&self, key: &str, context: &PipelineContext) -> Option<bool> {
        match self.values.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::String(_) => match self.get_str(key, context)?.trim() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// List input; accepts a YAML sequence or a newline/comma separated string
    pub fn get_list(&self, key: &str, context: &PipelineContext) -> Vec<String> {
        self.list(key, context, |s| s.split(['\n', ',']).map(str::to_string).collect())
    }

    /// Path list input; a string is split on newlines only, since file
    /// names may contain commas
    pub fn get_paths(&self, key: &str, context: &PipelineContext) -> Vec<String> {
        self.list(key, context, |s| s.lines().map(str::to_string).collect())
    }

    fn list(
        &self,
        key: &str,
        context: &PipelineContext,
        split: impl Fn(&str) -> Vec<String>,
    ) -> Vec<String> {
        let items: Vec<String> = match self.values.get(key) {
            Some(Value::Sequence(seq)) => seq
                .iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(context.render(s)),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .filter(|s| !has_placeholder(s))
                .collect(),
            Some(_) => self
                .get_str(key, context)
                .map(|s| split(&s))
                .unwrap_or_default(),
            None => Vec::new(),
        };

        items
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// A single step in a pipeline
#[derive(Debug, Clone)]
pub struct Step {
    /// Unique step identifier
    pub id: String,

    /// Human-readable name
    pub name: String,

    /// What the step runs
    pub action: StepAction,

    /// Action inputs
    pub inputs: StepInputs,

    /// Condition gating the step
    pub condition: Option<Condition>,

    /// Extra environment for subprocesses (values are templates)
    pub env: BTreeMap<String, String>,

    /// Timeout in seconds
    pub timeout_secs: u64,

    /// Runtime state
    pub state: StepState,
}

impl Step {
    /// Create a step from a step config
    pub fn from_config(config: &StepConfig, defaults: &StepDefaults) -> Result<Self, ConditionError> {
        let action = match (&config.uses, &config.run) {
            (Some(kind), _) => StepAction::Builtin(*kind),
            (None, Some(command)) => StepAction::Run(command.clone()),
            // Rejected by config validation; treat as a no-op command
            (None, None) => StepAction::Run("true".to_string()),
        };

        let condition = config
            .condition
            .as_deref()
            .map(Condition::parse)
            .transpose()?;

        Ok(Step {
            id: config.id.clone(),
            name: config.display_name().to_string(),
            action,
            inputs: StepInputs::new(config.inputs.clone()),
            condition,
            env: config.env.clone(),
            timeout_secs: config.timeout_secs.unwrap_or(defaults.timeout_secs),
            state: StepState::Pending,
        })
    }

    /// Whether the step's condition holds in this context (no condition = always)
    pub fn should_run(&self, context: &PipelineContext) -> bool {
        match &self.condition {
            Some(condition) => condition.evaluate(&context.get_rendering_variables()),
            None => true,
        }
    }

    /// Rendered environment for the step's processes
    pub fn render_env(&self, context: &PipelineContext) -> HashMap<String, String> {
        self.env
            .iter()
            .map(|(k, v)| (k.clone(), context.render(v)))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct StepDefaults {
    pub timeout_secs: u64,
}

impl Default for StepDefaults {
    fn default() -> Self {
        Self {
            timeout_secs: 3600, // builds can be slow
        }
    }
}
