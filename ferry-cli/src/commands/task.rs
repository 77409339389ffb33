//! Task command handlers
//!
//! Thin wrappers over the service's remote task passthroughs. Bodies are
//! printed as pretty JSON, unchanged.

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use ferry_core::dto::task::SubmitTask;
use serde_json::Value;

use crate::api::ApiClient;
use crate::config::Config;

/// Task subcommands
#[derive(Subcommand)]
pub enum TaskCommands {
    /// Submit the source manifest task once, without waiting for it
    Submit {
        /// Bucket to scan (defaults to the service's configured bucket)
        #[arg(short, long)]
        bucket: Option<String>,

        /// Use the alternate dataset credentials
        #[arg(long)]
        alternate: bool,
    },
    /// Show a remote task
    Get {
        /// Remote task ID
        id: String,
    },
    /// Show execution details of a remote task
    Details {
        /// Remote task ID
        id: String,
    },
}

/// Handle task commands
pub async fn handle_task_command(command: TaskCommands, config: &Config) -> Result<()> {
    let client = ApiClient::new(&config.service_url);

    match command {
        TaskCommands::Submit { bucket, alternate } => {
            let task = client
                .submit_task(SubmitTask {
                    bucket,
                    alternate_dataset: alternate,
                })
                .await?;

            println!("{}", "✓ Task submitted!".green().bold());
            if let Some(id) = task.get("id").and_then(Value::as_str) {
                println!("  Task ID: {}", id.cyan());
            }
            print_json(&task)
        }
        TaskCommands::Get { id } => print_json(&client.get_task(&id).await?),
        TaskCommands::Details { id } => print_json(&client.get_execution_details(&id).await?),
    }
}

/// List apps visible on the remote platform
pub async fn list_apps(config: &Config) -> Result<()> {
    let client = ApiClient::new(&config.service_url);
    let apps = client.list_apps().await?;

    let items = apps
        .get("items")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    if items.is_empty() {
        println!("{}", "No apps found.".yellow());
        return Ok(());
    }

    println!("{}", format!("Found {} app(s):", items.len()).bold());
    println!();
    for app in &items {
        let name = app.get("name").and_then(Value::as_str).unwrap_or("<unnamed>");
        let id = app.get("id").and_then(Value::as_str).unwrap_or("-");
        println!("  {} {}", "▸".cyan(), name.bold());
        println!("    ID: {}", id.dimmed());
    }

    Ok(())
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
