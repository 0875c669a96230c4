//! CLI output formatting

use crate::{
    core::{ExecutionStatus, PlannedStep, StepState},
    execution::ExecutionEvent,
    persistence::ExecutionSummary,
};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");
pub static SKIP: Emoji<'_, '_> = Emoji("⏭️  ", "- ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Create a spinner for a running step
pub fn create_spinner(message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Format a step state for display
pub fn format_step_state(state: &StepState) -> String {
    match state {
        StepState::Pending => style("PENDING").dim().to_string(),
        StepState::Running { .. } => style("RUNNING").yellow().to_string(),
        StepState::Completed { .. } => style("COMPLETED").green().to_string(),
        StepState::Failed { .. } => style("FAILED").red().to_string(),
        StepState::Skipped { .. } => style("SKIPPED").dim().to_string(),
    }
}

/// Format an execution status for display
pub fn format_status(status: ExecutionStatus) -> String {
    match status {
        ExecutionStatus::Pending => style("PENDING").dim().to_string(),
        ExecutionStatus::Running => style("RUNNING").yellow().to_string(),
        ExecutionStatus::Completed => style("COMPLETED").green().to_string(),
        ExecutionStatus::Failed => style("FAILED").red().to_string(),
    }
}

fn short_id(id: &uuid::Uuid) -> String {
    id.to_string().chars().take(8).collect()
}

/// Format run summary for display
pub fn format_execution_summary(summary: &ExecutionSummary) -> String {
    let status_icon = match summary.status {
        ExecutionStatus::Completed => CHECK,
        ExecutionStatus::Failed => CROSS,
        ExecutionStatus::Running => SPINNER,
        _ => INFO,
    };

    let outcome = match summary.status {
        ExecutionStatus::Failed => style(summary.outcome()).red().to_string(),
        _ => format_status(summary.status),
    };

    format!(
        "{} {} - {} - {} - {} ({}/{} run, {} skipped)",
        status_icon,
        style(short_id(&summary.execution_id)).dim(),
        style(&summary.pipeline_name).bold(),
        style(&summary.git_ref).cyan(),
        outcome,
        summary.completed_steps,
        summary.total_steps,
        summary.skipped_steps
    )
}

/// Format an execution event for display
pub fn format_execution_event(event: &ExecutionEvent) -> String {
    match event {
        ExecutionEvent::PipelineStarted {
            execution_id,
            pipeline_name,
        } => format!(
            "{} Starting pipeline {} ({})",
            ROCKET,
            style(pipeline_name).bold(),
            style(short_id(execution_id)).dim()
        ),
        ExecutionEvent::StepStarted {
            step_id,
            index,
            total,
        } => format!(
            "{} [{}/{}] {}",
            SPINNER,
            index,
            total,
            style(step_id).cyan()
        ),
        ExecutionEvent::StepOutput { step_id, output } => {
            format!("{} Output from {}:\n{}", INFO, style(step_id).dim(), output)
        }
        ExecutionEvent::StepCompleted { step_id } => {
            format!("{} {}", CHECK, style(step_id).green())
        }
        ExecutionEvent::StepSkipped { step_id, reason } => {
            format!("{} {} ({})", SKIP, style(step_id).dim(), style(reason).dim())
        }
        ExecutionEvent::StepFailed { step_id, error } => {
            format!("{} {}: {}", CROSS, style(step_id).red(), style(error).dim())
        }
        ExecutionEvent::PipelineCompleted {
            execution_id,
            status,
        } => {
            let status_str = match status {
                ExecutionStatus::Completed => format!("{} completed", style("successfully").green()),
                ExecutionStatus::Failed => style("failed").red().to_string(),
                other => other.as_str().to_lowercase(),
            };
            format!(
                "{} Pipeline ({}) {}",
                INFO,
                style(short_id(execution_id)).dim(),
                status_str
            )
        }
    }
}

/// Format a dry plan, one step per line
pub fn format_plan(plan: &[PlannedStep]) -> String {
    plan.iter()
        .enumerate()
        .map(|(i, step)| {
            let marker = if step.runs { CHECK } else { SKIP };
            let condition = step
                .condition
                .as_ref()
                .map(|c| format!(" if {}", style(c).dim()))
                .unwrap_or_default();
            let verdict = if step.runs {
                style("runs").green().to_string()
            } else {
                style("skipped").dim().to_string()
            };
            format!(
                "  {}{}. {} [{}]{} - {}",
                marker,
                i + 1,
                style(&step.name).bold(),
                step.action,
                condition,
                verdict
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format step output with truncation
pub fn format_output(output: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = output.lines().collect();

    if lines.len() <= max_lines {
        output.to_string()
    } else {
        let truncated = lines[..max_lines].join("\n");
        format!(
            "{}\n{}... ({} more lines)",
            truncated,
            style("[truncated]").dim(),
            lines.len() - max_lines
        )
    }
}

/// Prints engine events, with a spinner while a step runs
pub struct ConsoleReporter {
    spinner: Mutex<Option<ProgressBar>>,
    show_output: bool,
}

impl ConsoleReporter {
    pub fn new(show_output: bool) -> Self {
        Self {
            spinner: Mutex::new(None),
            show_output,
        }
    }

    fn clear_spinner(&self) {
        if let Ok(mut spinner) = self.spinner.lock() {
            if let Some(bar) = spinner.take() {
                bar.finish_and_clear();
            }
        }
    }

    pub fn handle(&self, event: &ExecutionEvent) {
        match event {
            ExecutionEvent::StepStarted {
                step_id,
                index,
                total,
            } => {
                self.clear_spinner();
                let bar = create_spinner(format!("[{}/{}] {}", index, total, step_id));
                if let Ok(mut spinner) = self.spinner.lock() {
                    *spinner = Some(bar);
                }
            }
            ExecutionEvent::StepOutput { step_id, output } => {
                if self.show_output {
                    self.clear_spinner();
                    println!("{} Output from {}:", INFO, style(step_id).dim());
                    println!("{}", format_output(output, 20));
                }
            }
            other => {
                self.clear_spinner();
                println!("{}", format_execution_event(other));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn plain(s: &str) -> String {
        console::strip_ansi_codes(s).to_string()
    }

    #[test]
    fn test_format_output_truncates() {
        let output = (1..=5).map(|i| format!("line {}", i)).collect::<Vec<_>>().join("\n");
        assert_eq!(format_output(&output, 10), output);

        let truncated = plain(&format_output(&output, 2));
        assert!(truncated.starts_with("line 1\nline 2\n"));
        assert!(truncated.ends_with("(3 more lines)"));
    }

    #[test]
    fn test_summary_shows_failed_stage() {
        let summary = ExecutionSummary {
            execution_id: Uuid::new_v4(),
            pipeline_name: "icalfilter-release".to_string(),
            git_ref: "refs/tags/v1.0.0".to_string(),
            status: ExecutionStatus::Failed,
            started_at: Utc::now(),
            completed_at: Some(Utc::now()),
            completed_steps: 2,
            skipped_steps: 2,
            total_steps: 5,
            failed_step: Some("build".to_string()),
            failed_stage: Some(3),
        };

        let line = plain(&format_execution_summary(&summary));
        assert!(line.contains("icalfilter-release"));
        assert!(line.contains("failed at stage 3"));
        assert!(line.contains("(2/5 run, 2 skipped)"));
    }

    #[test]
    fn test_format_plan() {
        let plan = vec![
            PlannedStep {
                id: "build".to_string(),
                name: "build".to_string(),
                action: "build".to_string(),
                condition: None,
                runs: true,
            },
            PlannedStep {
                id: "publish".to_string(),
                name: "publish".to_string(),
                action: "publish".to_string(),
                condition: Some("startsWith(github.ref, 'refs/tags/')".to_string()),
                runs: false,
            },
        ];

        let text = plain(&format_plan(&plan));
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].contains("1. build [build] - runs"));
        assert!(lines[1].contains("2. publish [publish] if startsWith(github.ref, 'refs/tags/') - skipped"));
    }

    #[test]
    fn test_skipped_event() {
        let line = plain(&format_execution_event(&ExecutionEvent::StepSkipped {
            step_id: "publish".to_string(),
            reason: "condition not met".to_string(),
        }));
        assert!(line.contains("publish (condition not met)"));
    }
}
