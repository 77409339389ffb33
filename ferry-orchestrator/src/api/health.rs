//! Health Check API Handler
//!
//! Liveness endpoint for monitoring. Does not call the remote task API.

use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::api::AppState;

/// GET /health
/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "trackedRuns": state.ledger.list().len(),
    }))
}
