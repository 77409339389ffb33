//! Pipeline command handlers
//!
//! Handles running, launching, inspecting and cancelling transfer pipeline
//! runs.

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::*;
use ferry_core::domain::pipeline::{PipelineRun, RunOutcome, StageEvent};
use ferry_core::dto::pipeline::{PipelineReport, StartPipeline};

use crate::api::ApiClient;
use crate::config::Config;
use crate::types::RunTarget;

/// Options shared by `run` and `launch`
#[derive(Args)]
pub struct StartArgs {
    /// Bucket to transfer (defaults to the service's configured bucket)
    #[arg(short, long)]
    bucket: Option<String>,

    /// Use the alternate dataset credentials
    #[arg(long)]
    alternate: bool,

    /// The transfer job already exists remotely and only needs to run
    #[arg(long)]
    transfer_job_exists: bool,
}

impl From<StartArgs> for StartPipeline {
    fn from(args: StartArgs) -> Self {
        StartPipeline {
            bucket: args.bucket,
            alternate_dataset: args.alternate,
            transfer_job_exists: args.transfer_job_exists,
        }
    }
}

/// Pipeline subcommands
#[derive(Subcommand)]
pub enum PipelineCommands {
    /// Run the three stages and wait for the outcome
    Run(StartArgs),
    /// Start the three stages in the background
    Launch(StartArgs),
    /// Show the latest run for a bucket or run key
    Status {
        /// Bucket name or run key
        target: String,
    },
    /// Show every run recorded for a bucket or run key
    History {
        /// Bucket name or run key
        target: String,
    },
    /// List the latest run of every key
    List,
    /// Cancel an in-flight run
    Cancel {
        /// Bucket name or run key
        target: String,
    },
}

/// Handle pipeline commands
///
/// Routes pipeline subcommands to their respective handlers.
pub async fn handle_pipeline_command(command: PipelineCommands, config: &Config) -> Result<()> {
    let client = ApiClient::new(&config.service_url);

    match command {
        PipelineCommands::Run(args) => run_pipeline(&client, args.into()).await,
        PipelineCommands::Launch(args) => launch_pipeline(&client, args.into()).await,
        PipelineCommands::Status { target } => show_status(&client, &RunTarget::parse(&target)).await,
        PipelineCommands::History { target } => {
            show_history(&client, &RunTarget::parse(&target)).await
        }
        PipelineCommands::List => list_runs(&client).await,
        PipelineCommands::Cancel { target } => {
            cancel_run(&client, &RunTarget::parse(&target)).await
        }
    }
}

/// Run the pipeline synchronously
async fn run_pipeline(client: &ApiClient, req: StartPipeline) -> Result<()> {
    println!("{}", "Running transfer pipeline, this can take a while...".dimmed());

    let report = client.run_pipeline(req).await?;

    print_report(&report);

    Ok(())
}

/// Launch the pipeline in the background
async fn launch_pipeline(client: &ApiClient, req: StartPipeline) -> Result<()> {
    let ack = client.launch_pipeline(req).await?;

    println!("{}", "✓ Pipeline launched!".green().bold());
    println!("  Run key: {}", ack.run_key.cyan());
    println!("  {}", ack.message.dimmed());
    println!(
        "  Follow with: {}",
        format!("ferry pipeline status {}", ack.run_key).bold()
    );

    Ok(())
}

/// Show the latest run for a target
async fn show_status(client: &ApiClient, target: &RunTarget) -> Result<()> {
    let run = client.get_run(&target.run_key()).await?;

    print_run_details(&run);

    Ok(())
}

/// Show every run for a target
async fn show_history(client: &ApiClient, target: &RunTarget) -> Result<()> {
    let runs = client.get_history(&target.run_key()).await?;

    println!(
        "{}",
        format!("{} run(s) recorded for {}:", runs.len(), target).bold()
    );
    println!();
    for (i, run) in runs.iter().enumerate() {
        println!("{}", format!("#{}", i + 1).dimmed());
        print_run_details(run);
        println!();
    }

    Ok(())
}

/// List the latest run of every key
async fn list_runs(client: &ApiClient) -> Result<()> {
    let runs = client.list_runs().await?;

    if runs.is_empty() {
        println!("{}", "No pipeline runs recorded.".yellow());
    } else {
        println!("{}", format!("Found {} run(s):", runs.len()).bold());
        println!();
        for run in runs {
            print_run_summary(&run);
        }
    }

    Ok(())
}

/// Cancel an in-flight run
async fn cancel_run(client: &ApiClient, target: &RunTarget) -> Result<()> {
    let response = client.cancel_run(&target.run_key()).await?;

    if response.cancelled {
        println!(
            "{}",
            format!("✓ Cancellation requested for {}", response.run_key)
                .green()
                .bold()
        );
    } else {
        println!(
            "{}",
            format!("Run {} is not in flight, nothing to cancel.", response.run_key).yellow()
        );
    }

    Ok(())
}

fn outcome_label(outcome: RunOutcome) -> ColoredString {
    match outcome {
        RunOutcome::InProgress => "in progress".yellow(),
        RunOutcome::Succeeded => "succeeded".green(),
        RunOutcome::Failed => "failed".red(),
    }
}

/// Print the synchronous run report
fn print_report(report: &PipelineReport) {
    println!("{}", "✓ Pipeline finished!".green().bold());
    println!("  Run key: {}", report.run_key.cyan());
    println!("  Bucket:  {}", report.bucket.bold());
    println!("  Outcome: {}", outcome_label(report.outcome));
    for stage in &report.stages {
        println!(
            "    {} {:<22} {} {}",
            "▸".cyan(),
            stage.stage.to_string(),
            stage.task_id.dimmed(),
            stage.status.to_string().green()
        );
    }
}

/// Print a run summary
fn print_run_summary(run: &PipelineRun) {
    println!("  {} {}", "▸".cyan(), run.bucket.bold());
    println!("    Key:     {}", run.run_key.dimmed());
    println!("    Outcome: {}", outcome_label(run.outcome()));
    println!(
        "    Started: {}",
        run.started_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    println!();
}

/// Print detailed run information
fn print_run_details(run: &PipelineRun) {
    println!("{}", "Pipeline Run:".bold());
    println!("  Key:      {}", run.run_key.cyan());
    println!("  Bucket:   {}", run.bucket.bold());
    println!("  State:    {}", format!("{:?}", run.state).yellow());
    println!("  Outcome:  {}", outcome_label(run.outcome()));
    println!("  Started:  {}", run.started_at.format("%Y-%m-%d %H:%M:%S"));
    if let Some(finished) = run.finished_at {
        println!("  Finished: {}", finished.format("%Y-%m-%d %H:%M:%S"));
    }
    if let Some(error) = &run.error {
        println!("  Error:    {}", error.red());
    }

    if !run.events.is_empty() {
        println!("\n{}", "Events:".bold());
        for event in &run.events {
            print_event(event);
        }
    }
}

fn print_event(event: &StageEvent) {
    let kind = format!("{:?}", event.kind);
    let kind = if event.kind.is_failure() {
        kind.red()
    } else {
        kind.green()
    };

    println!(
        "  {} {:<22} {:<10} {}",
        event.at.format("%H:%M:%S").to_string().dimmed(),
        event.stage.to_string(),
        kind,
        event.task_id.as_deref().unwrap_or("-").dimmed()
    );
    if let Some(detail) = &event.detail {
        println!("      {}", detail.dimmed());
    }
}
