//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod pipeline;
mod task;

pub use pipeline::PipelineCommands;
pub use task::TaskCommands;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// List apps visible on the remote platform
    Apps,
    /// Transfer pipeline runs
    Pipeline {
        #[command(subcommand)]
        command: PipelineCommands,
    },
    /// Single remote tasks
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Apps => task::list_apps(config).await,
        Commands::Pipeline { command } => pipeline::handle_pipeline_command(command, config).await,
        Commands::Task { command } => task::handle_task_command(command, config).await,
    }
}
