//! Pipeline configuration from YAML

use crate::core::{condition::Condition, Pipeline};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Events a pipeline can be triggered by
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TriggerEvent {
    /// A push to any reference
    Push,
}

fn default_triggers() -> Vec<TriggerEvent> {
    vec![TriggerEvent::Push]
}

/// Built-in step actions
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    /// Fetch the repository at the triggering revision
    Checkout,
    /// Install and select a compiler toolchain
    Toolchain,
    /// Optimized workspace build
    Build,
    /// Strip and rename the built binary
    PostProcess,
    /// Upload artifacts to the release for the pushed tag
    Publish,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Checkout => "checkout",
            ActionKind::Toolchain => "toolchain",
            ActionKind::Build => "build",
            ActionKind::PostProcess => "post-process",
            ActionKind::Publish => "publish",
        }
    }
}

/// Top-level pipeline configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pipeline name
    pub name: String,

    /// Pipeline version (optional)
    #[serde(default)]
    pub version: Option<String>,

    /// Events that start the pipeline
    #[serde(default = "default_triggers", rename = "on")]
    pub triggers: Vec<TriggerEvent>,

    /// Global variables available to all steps
    #[serde(default)]
    pub variables: BTreeMap<String, String>,

    /// Pipeline steps, executed in order
    pub steps: Vec<StepConfig>,

    /// Default timeout for steps (in seconds)
    #[serde(default)]
    pub default_timeout_secs: Option<u64>,
}

/// Step configuration as defined in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepConfig {
    /// Unique step identifier
    pub id: String,

    /// Human-readable step name
    #[serde(default)]
    pub name: Option<String>,

    /// Optional step description
    #[serde(default)]
    pub description: Option<String>,

    /// Built-in action to run
    #[serde(default)]
    pub uses: Option<ActionKind>,

    /// Shell command to run
    #[serde(default)]
    pub run: Option<String>,

    /// Inputs for the action
    #[serde(default, rename = "with")]
    pub inputs: BTreeMap<String, Value>,

    /// Condition that must hold for the step to run
    #[serde(default, rename = "if")]
    pub condition: Option<String>,

    /// Extra environment for the step's processes
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Timeout for this step (overrides global)
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl StepConfig {
    /// Name to show for the step
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

impl PipelineConfig {
    /// Load pipeline configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_yaml(&content)
    }

    /// Parse pipeline configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: PipelineConfig =
            serde_yaml::from_str(yaml).context("Invalid pipeline YAML")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the pipeline configuration
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            anyhow::bail!("Pipeline name must not be empty");
        }

        if self.triggers.is_empty() {
            anyhow::bail!("Pipeline '{}' has no trigger events", self.name);
        }

        let mut seen_ids = std::collections::HashSet::new();
        for step in &self.steps {
            if step.id.trim().is_empty() {
                anyhow::bail!("Step IDs must not be empty");
            }
            if !seen_ids.insert(&step.id) {
                anyhow::bail!("Duplicate step ID: {}", step.id);
            }

            match (&step.uses, &step.run) {
                (Some(_), Some(_)) => anyhow::bail!(
                    "Step '{}' sets both 'uses' and 'run'; pick one",
                    step.id
                ),
                (None, None) => anyhow::bail!(
                    "Step '{}' needs either 'uses' or 'run'",
                    step.id
                ),
                (None, Some(command)) if command.trim().is_empty() => {
                    anyhow::bail!("Step '{}' has an empty 'run' command", step.id)
                }
                _ => {}
            }

            if let Some(condition) = &step.condition {
                Condition::parse(condition).map_err(|e| {
                    anyhow::anyhow!("Step '{}' has an invalid condition '{}': {}", step.id, condition, e)
                })?;
            }

            if let Some(0) = step.timeout_secs {
                anyhow::bail!("Step '{}' timeout must be greater than zero", step.id);
            }
        }

        Ok(())
    }

    /// Variables as a plain string map
    pub fn variables_as_string_map(&self) -> HashMap<String, String> {
        self.variables
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Convert config to a Pipeline domain model
    pub fn to_pipeline(&self) -> Result<Pipeline> {
        Pipeline::from_config(self)
    }
}
