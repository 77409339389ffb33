//! Ferry CLI
//!
//! Command-line interface for the transfer pipeline orchestrator.

mod api;
mod commands;
mod config;
mod types;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;

#[derive(Parser)]
#[command(name = "ferry")]
#[command(about = "Transfer pipeline CLI", long_about = None)]
struct Cli {
    /// Orchestrator service URL
    #[arg(long, env = "FERRY_URL", default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config {
        service_url: cli.url,
    };

    handle_command(cli.command, &config).await
}
