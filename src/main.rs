use anyhow::{Context, Result};
use release_pipeline::cli::commands::{
    HistoryCommand, ListCommand, PlanCommand, RunCommand, ValidateCommand,
};
use release_pipeline::cli::output::*;
use release_pipeline::cli::{Cli, Command};
use release_pipeline::core::config::PipelineConfig;
use release_pipeline::core::{ExecutionStatus, PushEvent};
use release_pipeline::execution::ExecutionEngine;
use release_pipeline::persistence::{
    create_summary, ExecutionSummary, InMemoryPersistence, PersistenceBackend,
};
use release_pipeline::publish::{GithubConfig, GithubPublisher};
use release_pipeline::runner::ProcessRunner;
use std::sync::Arc;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))?;

    // Execute command
    match &cli.command {
        Command::Run(cmd) => run_pipeline(cmd, cli.verbose).await?,
        Command::Plan(cmd) => plan_pipeline(cmd)?,
        Command::Validate(cmd) => validate_pipeline(cmd)?,
        Command::List(cmd) => list_pipelines(cmd).await?,
        Command::History(cmd) => show_history(cmd).await?,
    }

    Ok(())
}

#[cfg(feature = "sqlite")]
async fn open_history() -> Result<Arc<dyn PersistenceBackend>> {
    let store = release_pipeline::persistence::SqliteExecutionStore::with_default_path()
        .await
        .context("Failed to open run history")?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "sqlite"))]
async fn open_history() -> Result<Arc<dyn PersistenceBackend>> {
    anyhow::bail!("Run history needs the `sqlite` feature")
}

fn require_event(git_ref: Option<&str>, sha: Option<&str>, repository: Option<&str>) -> PushEvent {
    match PushEvent::resolve(git_ref, sha, repository) {
        Some(event) => event,
        None => {
            eprintln!(
                "{} No pushed ref: pass --ref or set {}",
                CROSS,
                style("GITHUB_REF").bold()
            );
            std::process::exit(2);
        }
    }
}

async fn run_pipeline(cmd: &RunCommand, verbose: bool) -> Result<()> {
    // Load pipeline config
    let config = PipelineConfig::from_file(&cmd.file).context("Failed to load pipeline config")?;

    println!("{} Loaded pipeline: {}", INFO, style(&config.name).bold());

    let mut pipeline = config.to_pipeline()?;

    // Apply variable overrides
    for (key, value) in &cmd.variable {
        pipeline.variables.insert(key.clone(), value.clone());
        println!(
            "{} Variable override: {} = {}",
            INFO,
            style(key).cyan(),
            style(value).dim()
        );
    }

    let event = require_event(
        cmd.git_ref.as_deref(),
        cmd.sha.as_deref(),
        cmd.repository.as_deref(),
    );
    println!("{} Push to {}", INFO, style(event.git_ref.full()).cyan());

    if !pipeline.is_triggered_by(&event) {
        println!("{} Pipeline is not triggered by push events", WARN);
        return Ok(());
    }

    let workdir = match &cmd.workdir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to read current directory")?,
    };
    let mut context = pipeline.create_context(event.clone(), workdir);

    // Set up persistence
    let store: Arc<dyn PersistenceBackend> = if cmd.no_history {
        Arc::new(InMemoryPersistence::new())
    } else {
        open_history().await?
    };

    let publisher = GithubPublisher::new(GithubConfig::from_env())?;

    let engine = ExecutionEngine::new(ProcessRunner::new(), publisher);

    let reporter = Arc::new(ConsoleReporter::new(verbose));
    engine.add_event_handler(move |event| reporter.handle(&event));

    println!();
    let status = engine.execute(&mut pipeline, &mut context).await;

    // Save to history
    let summary = create_summary(&pipeline, &event);
    store.save_execution(&summary).await?;
    if !cmd.no_history {
        println!(
            "\n{} Run saved to history (ID: {})",
            INFO,
            style(summary.execution_id).dim()
        );
    }

    println!();
    for step in &pipeline.steps {
        println!("  {:<12} {}", step.id, format_step_state(&step.state));
    }
    for artifact in &context.artifacts {
        println!("  {} {}", ROCKET, style(artifact.display()).cyan());
    }

    // Print final status
    if status == ExecutionStatus::Completed {
        println!(
            "\n{} {} completed {}",
            CHECK,
            style(&pipeline.name).bold(),
            style("successfully").green()
        );
    } else {
        println!(
            "\n{} {} {}",
            CROSS,
            style(&pipeline.name).bold(),
            style(pipeline.state.outcome()).red()
        );
        error!(
            "Pipeline {} {}",
            pipeline.name,
            pipeline.state.outcome()
        );
        std::process::exit(1);
    }

    Ok(())
}

fn plan_pipeline(cmd: &PlanCommand) -> Result<()> {
    let config = PipelineConfig::from_file(&cmd.file).context("Failed to load pipeline config")?;
    let pipeline = config.to_pipeline()?;
    let event = require_event(cmd.git_ref.as_deref(), None, None);
    let plan = pipeline.plan(&event);

    if cmd.json {
        let data = serde_json::json!({
            "pipeline": pipeline.name,
            "ref": event.git_ref.full(),
            "steps": plan,
        });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    println!(
        "{} Plan for {} on {}:",
        INFO,
        style(&pipeline.name).bold(),
        style(event.git_ref.full()).cyan()
    );
    println!("{}", format_plan(&plan));

    Ok(())
}

fn validate_pipeline(cmd: &ValidateCommand) -> Result<()> {
    println!("{} Validating pipeline...", INFO);

    let result = PipelineConfig::from_file(&cmd.file).and_then(|config| {
        config.to_pipeline()?;
        Ok(config)
    });

    match result {
        Ok(config) => {
            println!("{} Pipeline configuration is valid!", CHECK);
            println!("  Name: {}", style(&config.name).bold());
            println!("  Steps: {}", style(config.steps.len()).cyan());
            println!("  Variables: {}", style(config.variables.len()).cyan());

            if cmd.json {
                let json = serde_json::to_string_pretty(&config)?;
                println!("\n{}", json);
            }
            Ok(())
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(format!("{:#}", e)).red());
            std::process::exit(1);
        }
    }
}

async fn list_pipelines(cmd: &ListCommand) -> Result<()> {
    let store = open_history().await?;
    let pipelines = store.list_pipelines().await?;

    if cmd.json {
        let mut json_data = Vec::new();
        for pipeline in &pipelines {
            let executions = store.list_executions(pipeline).await?;
            json_data.push(serde_json::json!({
                "name": pipeline,
                "runs": executions.len(),
                "succeeded": executions.iter().filter(|e| e.status == ExecutionStatus::Completed).count(),
                "failed": executions.iter().filter(|e| e.status == ExecutionStatus::Failed).count(),
            }));
        }
        let data = serde_json::json!({ "pipelines": json_data });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    if pipelines.is_empty() {
        println!("{} No pipelines found in history", INFO);
        return Ok(());
    }

    println!("{} Pipelines in history:", INFO);

    for pipeline_name in &pipelines {
        if cmd.with_counts {
            let executions = store.list_executions(pipeline_name).await?;
            let completed = executions.iter().filter(|e| e.status == ExecutionStatus::Completed).count();
            let failed = executions.iter().filter(|e| e.status == ExecutionStatus::Failed).count();
            println!(
                "  {} ({} runs: {} succeeded, {} failed)",
                style(pipeline_name).bold(),
                style(executions.len()).cyan(),
                style(completed).green(),
                style(failed).red()
            );
        } else {
            println!("  {}", style(pipeline_name).bold());
        }
    }

    Ok(())
}

async fn show_history(cmd: &HistoryCommand) -> Result<()> {
    let store = open_history().await?;

    // If specific execution ID is requested
    if let Some(exec_id_str) = &cmd.execution_id {
        let exec_id = uuid::Uuid::parse_str(exec_id_str).context("Invalid execution ID format")?;

        match store.load_execution(exec_id).await? {
            Some(summary) if cmd.json => println!("{}", serde_json::to_string_pretty(&summary)?),
            Some(summary) => print_execution_details(&summary),
            None => println!("{} Run not found", WARN),
        }
        return Ok(());
    }

    let mut executions = if let Some(pipeline_name) = &cmd.pipeline {
        store.list_executions(pipeline_name).await?
    } else {
        let mut all_execs = Vec::new();
        for pipeline in store.list_pipelines().await? {
            all_execs.extend(store.list_executions(&pipeline).await?);
        }
        all_execs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        all_execs
    };
    executions.truncate(cmd.limit);

    if cmd.json {
        let data = serde_json::json!({ "executions": executions });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    if executions.is_empty() {
        println!("{} No runs found", INFO);
        return Ok(());
    }

    println!("{} Run history (showing latest {}):", INFO, cmd.limit);
    for summary in &executions {
        println!("  {}", format_execution_summary(summary));
    }

    Ok(())
}

fn print_execution_details(summary: &ExecutionSummary) {
    println!("{} Run Details", INFO);
    println!("  ID: {}", style(summary.execution_id).cyan());
    println!("  Pipeline: {}", style(&summary.pipeline_name).bold());
    println!("  Ref: {}", style(&summary.git_ref).cyan());
    println!("  Status: {}", format_status(summary.status));
    println!("  Outcome: {}", summary.outcome());
    if let Some(step) = &summary.failed_step {
        println!("  Failed step: {}", style(step).red());
    }
    println!("  Started: {}", style(summary.started_at.to_rfc3339()).dim());
    if let Some(completed) = summary.completed_at {
        println!("  Completed: {}", style(completed.to_rfc3339()).dim());
        if let Ok(duration) = completed.signed_duration_since(summary.started_at).to_std() {
            println!("  Duration: {}", style(format_duration(duration)).dim());
        }
    }
    println!(
        "  Steps: {}/{} completed, {} skipped",
        summary.completed_steps, summary.total_steps, summary.skipped_steps
    );
}

fn format_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
