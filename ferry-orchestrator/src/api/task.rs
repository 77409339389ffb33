//! Task API Handlers
//!
//! Thin passthroughs to the remote task API. Responses are the remote bodies,
//! unchanged.

use axum::{
    Json,
    extract::{Path, State},
};
use ferry_core::domain::credentials::Dataset;
use ferry_core::domain::pipeline::Stage;
use ferry_core::dto::task::SubmitTask;
use serde_json::Value;

use crate::api::AppState;
use crate::api::error::ApiResult;
use crate::service::PipelineRequest;

/// GET /apps
/// List remote apps
pub async fn list_apps(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    tracing::debug!("Listing remote apps");
    Ok(Json(state.tasks.list_apps().await?))
}

/// POST /tasks
/// Submit the source manifest task once, without polling
pub async fn submit_task(
    State(state): State<AppState>,
    Json(req): Json<SubmitTask>,
) -> ApiResult<Json<Value>> {
    let bucket = state.resolve_bucket(req.bucket)?;
    tracing::info!("Submitting source manifest task for bucket {}", bucket);

    let request = PipelineRequest::new(bucket, Dataset::from(req.alternate_dataset));
    let handle = state
        .orchestrator
        .submit_stage(Stage::SourceManifest, &request)
        .await?;

    Ok(Json(handle.raw))
}

/// GET /tasks/{id}
/// Current remote task body
pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    tracing::debug!("Getting task: {}", id);
    let snapshot = state.tasks.get_status(&id).await?;
    Ok(Json(snapshot.payload))
}

/// GET /tasks/{id}/execution_details
/// Remote execution details
pub async fn get_execution_details(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    tracing::debug!("Getting execution details for task: {}", id);
    Ok(Json(state.tasks.get_execution_details(&id).await?))
}
