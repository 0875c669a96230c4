//! Pipeline context - shared state and variables

use crate::core::trigger::PushEvent;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Execution context for a pipeline run
///
/// Contains the triggering event, shared variables, step outputs and the
/// artifacts produced so far.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineContext {
    /// The event that started the run
    pub event: PushEvent,

    /// Directory the steps run in
    pub workdir: PathBuf,

    /// Global and user-defined variables
    pub variables: HashMap<String, String>,

    /// Outputs from completed steps (step_id -> name -> value)
    pub step_outputs: HashMap<String, HashMap<String, String>>,

    /// Release artifacts produced by earlier steps, in production order
    pub artifacts: Vec<PathBuf>,

    /// The current step being executed (if any)
    pub current_step_id: Option<String>,
}

impl PipelineContext {
    /// Create a new context for an event
    pub fn new(event: PushEvent, workdir: impl Into<PathBuf>) -> Self {
        Self {
            event,
            workdir: workdir.into(),
            variables: HashMap::new(),
            step_outputs: HashMap::new(),
            artifacts: Vec::new(),
            current_step_id: None,
        }
    }

    /// Set a variable
    pub fn set_variable(&mut self, key: String, value: String) {
        self.variables.insert(key, value);
    }

    /// Get a variable
    pub fn get_variable(&self, key: &str) -> Option<&String> {
        self.variables.get(key)
    }

    /// Record the outputs of a step
    pub fn set_step_outputs(&mut self, step_id: &str, outputs: HashMap<String, String>) {
        self.step_outputs
            .entry(step_id.to_string())
            .or_default()
            .extend(outputs);
    }

    /// Get one output of a step
    pub fn get_step_output(&self, step_id: &str, name: &str) -> Option<&String> {
        self.step_outputs.get(step_id).and_then(|o| o.get(name))
    }

    /// Register a release artifact
    pub fn add_artifact(&mut self, path: PathBuf) {
        if !self.artifacts.contains(&path) {
            self.artifacts.push(path);
        }
    }

    /// Resolve a path relative to the working directory
    pub fn resolve_path(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workdir.join(path)
        }
    }

    /// Get all variables available for rendering and conditions
    pub fn get_rendering_variables(&self) -> HashMap<String, String> {
        let mut vars = self.variables.clone();

        vars.insert("event_name".to_string(), "push".to_string());
        vars.insert("ref".to_string(), self.event.git_ref.full());
        vars.insert("ref_name".to_string(), self.event.git_ref.short_name().to_string());
        vars.insert("ref_type".to_string(), self.event.git_ref.ref_type().to_string());
        vars.insert("sha".to_string(), self.event.sha.clone().unwrap_or_default());
        vars.insert(
            "repository".to_string(),
            self.event.repository.clone().unwrap_or_default(),
        );
        vars.insert("workspace".to_string(), self.workdir.display().to_string());

        for (step_id, outputs) in &self.step_outputs {
            for (name, value) in outputs {
                vars.insert(format!("steps.{}.{}", step_id, name), value.clone());
            }
        }

        if let Some(ref current_step) = self.current_step_id {
            vars.insert("current_step".to_string(), current_step.clone());
        }

        vars
    }

    /// Render `{{ name }}` placeholders with the current variables
    pub fn render(&self, template: &str) -> String {
        render_template(template, &self.get_rendering_variables())
    }
}

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z0-9_.\-]+)\s*\}\}").expect("placeholder regex is valid")
    })
}

/// Whether `text` still holds a `{{ name }}` placeholder after rendering
pub fn has_placeholder(text: &str) -> bool {
    placeholder_regex().is_match(text)
}

/// Replace `{{ name }}` placeholders; unknown names are left untouched
pub fn render_template(template: &str, vars: &HashMap<String, String>) -> String {
    placeholder_regex()
        .replace_all(template, |caps: &regex::Captures<'_>| {
            let key = &caps[1];
            let key = key.strip_prefix("github.").unwrap_or(key);
            match vars.get(key) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}
