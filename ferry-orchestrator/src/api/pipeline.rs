//! Pipeline API Handlers
//!
//! HTTP endpoints for running, launching and inspecting pipeline runs.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use ferry_core::domain::credentials::Dataset;
use ferry_core::domain::pipeline::PipelineRun;
use ferry_core::dto::pipeline::{CancelResponse, LaunchAck, PipelineReport, StartPipeline};

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};
use crate::service::PipelineRequest;

/// POST /pipeline/run
/// Run the chain and wait for the outcome
pub async fn run_pipeline(
    State(state): State<AppState>,
    Json(req): Json<StartPipeline>,
) -> ApiResult<Json<PipelineReport>> {
    let request = to_request(&state, req)?;
    tracing::info!("Running pipeline for bucket {}", request.bucket);

    let report = state.orchestrator.run(request).await?;

    Ok(Json(report))
}

/// POST /pipeline/launch
/// Start the chain in the background
pub async fn launch_pipeline(
    State(state): State<AppState>,
    Json(req): Json<StartPipeline>,
) -> ApiResult<(StatusCode, Json<LaunchAck>)> {
    let request = to_request(&state, req)?;
    tracing::info!("Launching pipeline for bucket {}", request.bucket);

    let ack = state.orchestrator.launch(request)?;

    Ok((StatusCode::ACCEPTED, Json(ack)))
}

/// GET /pipeline/list
/// Latest run of every key
pub async fn list_runs(State(state): State<AppState>) -> Json<Vec<PipelineRun>> {
    tracing::debug!("Listing pipeline runs");
    Json(state.ledger.list())
}

/// GET /pipeline/{run_key}
/// Latest run for a key
pub async fn get_run(
    State(state): State<AppState>,
    Path(run_key): Path<String>,
) -> ApiResult<Json<PipelineRun>> {
    tracing::debug!("Getting pipeline run: {}", run_key);

    state
        .ledger
        .get(&run_key)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No run recorded for {}", run_key)))
}

/// GET /pipeline/{run_key}/history
/// Every run recorded for a key, oldest first
pub async fn get_history(
    State(state): State<AppState>,
    Path(run_key): Path<String>,
) -> ApiResult<Json<Vec<PipelineRun>>> {
    let history = state.ledger.history(&run_key);
    if history.is_empty() {
        return Err(ApiError::NotFound(format!("No run recorded for {}", run_key)));
    }

    Ok(Json(history))
}

/// POST /pipeline/{run_key}/cancel
/// Cancel an in-flight run
pub async fn cancel_run(
    State(state): State<AppState>,
    Path(run_key): Path<String>,
) -> ApiResult<Json<CancelResponse>> {
    if state.ledger.get(&run_key).is_none() {
        return Err(ApiError::NotFound(format!("No run recorded for {}", run_key)));
    }

    let cancelled = state.orchestrator.cancel(&run_key);
    tracing::info!("Cancel requested for {} (in flight: {})", run_key, cancelled);

    Ok(Json(CancelResponse { run_key, cancelled }))
}

// =============================================================================
// Validation
// =============================================================================

fn to_request(state: &AppState, req: StartPipeline) -> ApiResult<PipelineRequest> {
    let bucket = state.resolve_bucket(req.bucket)?;
    Ok(PipelineRequest::new(bucket, Dataset::from(req.alternate_dataset))
        .with_existing_transfer_job(req.transfer_job_exists))
}
