use std::sync::Arc;

use anyhow::Context;
use ferry_client::{HttpTaskClient, TaskApi};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;
pub mod config;
pub mod repository;
pub mod service;

use crate::api::AppState;
use crate::config::Config;
use crate::repository::{InMemoryLedger, JobLedger};
use crate::service::PipelineOrchestrator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ferry_orchestrator=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Ferry Orchestrator...");

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    tracing::debug!("Configuration: {:?}", config);

    let http_client = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()
        .context("Failed to build HTTP client")?;
    let tasks: Arc<dyn TaskApi> = Arc::new(HttpTaskClient::with_client(
        &config.api_endpoint,
        &config.auth_token,
        http_client,
    ));
    tracing::info!("Remote task API: {}", config.api_endpoint);

    let ledger: Arc<dyn JobLedger> = Arc::new(InMemoryLedger::new());

    let shutdown = CancellationToken::new();
    let orchestrator = PipelineOrchestrator::new(
        Arc::clone(&tasks),
        Arc::clone(&ledger),
        config.stage_templates(),
        config.credentials.clone(),
        config.poll,
    )
    .with_shutdown(shutdown.clone());

    let app = api::create_router(AppState {
        orchestrator: Arc::new(orchestrator),
        tasks,
        ledger,
        default_bucket: Arc::from(config.default_bucket.as_str()),
    });

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .context("Server error")?;

    tracing::info!("Ferry Orchestrator stopped");
    Ok(())
}

/// Waits for Ctrl-C, then cancels every in-flight run
async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }

    tracing::info!("Shutdown requested, cancelling in-flight pipelines");
    shutdown.cancel();
}
