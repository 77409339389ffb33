//! API Module
//!
//! HTTP API layer for the orchestrator.
//! Each submodule handles endpoints for a specific domain.

pub mod error;
pub mod health;
pub mod pipeline;
pub mod task;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use ferry_client::TaskApi;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::api::error::{ApiError, ApiResult};
use crate::repository::JobLedger;
use crate::service::PipelineOrchestrator;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<PipelineOrchestrator>,
    pub tasks: Arc<dyn TaskApi>,
    pub ledger: Arc<dyn JobLedger>,
    pub default_bucket: Arc<str>,
}

impl AppState {
    /// Picks the requested bucket, or the configured default when none is given
    fn resolve_bucket(&self, bucket: Option<String>) -> ApiResult<String> {
        let bucket = bucket.unwrap_or_else(|| self.default_bucket.to_string());
        let bucket = bucket.trim();

        if bucket.is_empty() {
            return Err(ApiError::BadRequest("bucket must not be empty".to_string()));
        }
        if bucket.chars().any(char::is_whitespace) {
            return Err(ApiError::BadRequest(format!(
                "bucket '{}' must not contain whitespace",
                bucket
            )));
        }

        Ok(bucket.to_string())
    }
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Remote task passthroughs
        .route("/apps", get(task::list_apps))
        .route("/tasks", post(task::submit_task))
        .route("/tasks/{id}", get(task::get_task))
        .route(
            "/tasks/{id}/execution_details",
            get(task::get_execution_details),
        )
        // Pipeline endpoints
        .route("/pipeline/run", post(pipeline::run_pipeline))
        .route("/pipeline/launch", post(pipeline::launch_pipeline))
        .route("/pipeline/list", get(pipeline::list_runs))
        .route("/pipeline/{run_key}", get(pipeline::get_run))
        .route("/pipeline/{run_key}/history", get(pipeline::get_history))
        .route("/pipeline/{run_key}/cancel", post(pipeline::cancel_run))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryLedger;
    use crate::service::poller::PollSettings;
    use crate::service::stages::fixtures::{credentials, templates};
    use crate::service::testing::{ScriptedApi, StatusFault, Submit};
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use serde_json::{Value, json};
    use std::time::Duration;
    use tower::ServiceExt;

    fn app(api: ScriptedApi) -> (Router, Arc<ScriptedApi>) {
        let api = Arc::new(api);
        let ledger: Arc<dyn JobLedger> = Arc::new(InMemoryLedger::new());
        let orchestrator = PipelineOrchestrator::new(
            api.clone(),
            Arc::clone(&ledger),
            templates(),
            credentials(),
            PollSettings::new(Duration::from_secs(20), 15),
        );
        let state = AppState {
            orchestrator: Arc::new(orchestrator),
            tasks: api.clone(),
            ledger,
            default_bucket: Arc::from("default-bucket"),
        };
        (create_router(state), api)
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn happy_path() -> ScriptedApi {
        ScriptedApi::new()
            .on_submit(Submit::Id("t1"))
            .on_submit(Submit::Id("t2"))
            .on_submit(Submit::Id("t3"))
            .on_status("t1", &["RUNNING", "COMPLETED"])
            .on_status("t2", &["COMPLETED"])
            .on_status("t3", &["QUEUED", "COMPLETED"])
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app(ScriptedApi::new());
        let (status, body) = send(&app, "GET", "/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["trackedRuns"], 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_reports_every_stage() {
        let (app, _) = app(happy_path());
        let (status, body) = send(
            &app,
            "POST",
            "/pipeline/run",
            Some(json!({ "bucket": "acme-data" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["runKey"], "acme-data_transfer_pipeline");
        assert_eq!(body["outcome"], "succeeded");
        let stages = body["stages"].as_array().unwrap();
        assert_eq!(stages.len(), 3);
        assert_eq!(stages[2]["taskId"], "t3");
        assert_eq!(stages[2]["status"], "COMPLETED");

        let (status, run) = send(&app, "GET", "/pipeline/acme-data_transfer_pipeline", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(run["state"], "succeeded");
        assert_eq!(run["events"].as_array().unwrap().len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_without_bucket_uses_default() {
        let (app, api) = app(happy_path());
        let (status, body) = send(&app, "POST", "/pipeline/run", Some(json!({}))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["runKey"], "default-bucket_transfer_pipeline");
        let submitted = api.submitted.lock().unwrap();
        assert_eq!(submitted[0].inputs["BUCKET"].as_text(), Some("default-bucket"));
    }

    #[tokio::test]
    async fn test_blank_bucket_is_bad_request() {
        let (app, api) = app(ScriptedApi::new());
        let (status, body) = send(
            &app,
            "POST",
            "/pipeline/run",
            Some(json!({ "bucket": "   " })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("empty"));
        assert!(api.submitted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_submission_surfaces_remote_body() {
        let api = ScriptedApi::new().on_submit(Submit::Rejected(
            400,
            "{\"message\":\"Invalid app\"}",
        ));
        let (app, _) = app(api);
        let (status, body) = send(
            &app,
            "POST",
            "/pipeline/run",
            Some(json!({ "bucket": "acme-data" })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["rawContent"], "{\"message\":\"Invalid app\"}");
        assert_eq!(body["statusCode"], 400);

        let (_, run) = send(&app, "GET", "/pipeline/acme-data_transfer_pipeline", None).await;
        assert_eq!(run["state"], "failed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stage_timeout_maps_to_gateway_timeout() {
        let api = ScriptedApi::new()
            .on_submit(Submit::Id("t1"))
            .on_status("t1", &["RUNNING"]);
        let (app, _) = app(api);
        let (status, body) = send(
            &app,
            "POST",
            "/pipeline/run",
            Some(json!({ "bucket": "acme-data" })),
        )
        .await;

        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert!(body["error"].as_str().unwrap().contains("t1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_lookup_failure_surfaces_remote_body() {
        let api = ScriptedApi::new()
            .on_submit(Submit::Id("t1"))
            .on_submit(Submit::Id("t2"))
            .on_status("t1", &["COMPLETED"])
            .on_status_fault("t2", StatusFault::Decode(200, "<html>gateway</html>"));
        let (app, api) = app(api);
        let (status, body) = send(
            &app,
            "POST",
            "/pipeline/run",
            Some(json!({ "bucket": "acme-data" })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["rawContent"], "<html>gateway</html>");
        assert_eq!(body["statusCode"], 200);
        assert_eq!(api.submitted_apps().len(), 2);

        let (_, run) = send(&app, "GET", "/pipeline/acme-data_transfer_pipeline", None).await;
        assert_eq!(run["state"], "failed");
        assert_eq!(run["events"][3]["kind"], "rejected");
        assert_eq!(run["events"][3]["task_id"], "t2");
    }

    #[tokio::test]
    async fn test_launch_is_accepted_and_duplicate_refused() {
        let api = ScriptedApi::new()
            .on_submit(Submit::Id("t1"))
            .on_status("t1", &["RUNNING"]);
        let (app, _) = app(api);

        let (status, ack) = send(
            &app,
            "POST",
            "/pipeline/launch",
            Some(json!({ "bucket": "acme-data" })),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(ack["runKey"], "acme-data_transfer_pipeline");
        assert!(ack["message"].as_str().unwrap().contains("acme-data"));

        let (status, body) = send(
            &app,
            "POST",
            "/pipeline/launch",
            Some(json!({ "bucket": "acme-data" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].as_str().unwrap().contains("acme-data_transfer_pipeline"));

        let (status, cancel) = send(
            &app,
            "POST",
            "/pipeline/acme-data_transfer_pipeline/cancel",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cancel["cancelled"], true);
    }

    #[tokio::test]
    async fn test_unknown_run_key() {
        let (app, _) = app(ScriptedApi::new());

        let (status, _) = send(&app, "GET", "/pipeline/nope_transfer_pipeline", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, "GET", "/pipeline/nope_transfer_pipeline/history", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, "POST", "/pipeline/nope_transfer_pipeline/cancel", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, list) = send(&app, "GET", "/pipeline/list", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list, json!([]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_history_keeps_earlier_runs() {
        let api = happy_path()
            .on_submit(Submit::Rejected(500, "boom"));
        let (app, _) = app(api);

        let body = Some(json!({ "bucket": "acme-data" }));
        let (status, _) = send(&app, "POST", "/pipeline/run", body.clone()).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, "POST", "/pipeline/run", body).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);

        let (_, history) = send(&app, "GET", "/pipeline/acme-data_transfer_pipeline/history", None).await;
        let history = history.as_array().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0]["state"], "succeeded");
        assert_eq!(history[1]["state"], "failed");
    }

    #[tokio::test]
    async fn test_submit_task_returns_remote_body() {
        let api = ScriptedApi::new().on_submit(Submit::Id("t9"));
        let (app, api) = app(api);

        let (status, body) = send(
            &app,
            "POST",
            "/tasks",
            Some(json!({ "bucket": "acme-data", "alternateDataset": true })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], "t9");
        assert_eq!(api.submitted_apps(), vec!["lab/transfers/manifest-aws"]);
        let submitted = api.submitted.lock().unwrap();
        assert_eq!(submitted[0].inputs["AWS_ACCESS_KEY_ID"].as_text(), Some("AKIA_ALT"));
        assert!(api.status_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_task_passthroughs() {
        let api = ScriptedApi::new().on_status("t1", &["RUNNING"]);
        let (app, _) = app(api);

        let (status, body) = send(&app, "GET", "/tasks/t1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "id": "t1", "status": "RUNNING" }));

        let (status, body) = send(&app, "GET", "/tasks/t1/execution_details", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], "t1");

        let (status, body) = send(&app, "GET", "/apps", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["items"], json!([]));
    }
}
