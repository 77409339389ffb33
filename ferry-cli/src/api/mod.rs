//! API client module
//!
//! HTTP client for communicating with the orchestrator service.

use anyhow::{Context, Result};
use ferry_core::domain::pipeline::PipelineRun;
use ferry_core::dto::error::ErrorBody;
use ferry_core::dto::pipeline::{CancelResponse, LaunchAck, PipelineReport, StartPipeline};
use ferry_core::dto::task::SubmitTask;
use reqwest::Client;
use serde_json::Value;

/// HTTP client for the orchestrator service
pub struct ApiClient {
    base_url: String,
    client: Client,
}

impl ApiClient {
    /// Create a new API client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the orchestrator service
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    /// List the apps visible on the remote platform
    pub async fn list_apps(&self) -> Result<Value> {
        let url = format!("{}/apps", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send list apps request")?;

        self.handle_response(response).await
    }

    /// Submit the source manifest task on its own
    ///
    /// # Returns
    /// The remote task body
    pub async fn submit_task(&self, req: SubmitTask) -> Result<Value> {
        let url = format!("{}/tasks", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&req)
            .send()
            .await
            .context("Failed to send submit task request")?;

        self.handle_response(response).await
    }

    /// Get a remote task body
    pub async fn get_task(&self, id: &str) -> Result<Value> {
        let url = format!("{}/tasks/{}", self.base_url, id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send get task request")?;

        self.handle_response(response).await
    }

    /// Get execution details of a remote task
    pub async fn get_execution_details(&self, id: &str) -> Result<Value> {
        let url = format!("{}/tasks/{}/execution_details", self.base_url, id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send execution details request")?;

        self.handle_response(response).await
    }

    /// Run the pipeline and wait for its outcome
    ///
    /// The request stays open for as long as the three stages take.
    pub async fn run_pipeline(&self, req: StartPipeline) -> Result<PipelineReport> {
        let url = format!("{}/pipeline/run", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&req)
            .send()
            .await
            .context("Failed to send run pipeline request")?;

        self.handle_response(response).await
    }

    /// Launch the pipeline in the background
    pub async fn launch_pipeline(&self, req: StartPipeline) -> Result<LaunchAck> {
        let url = format!("{}/pipeline/launch", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&req)
            .send()
            .await
            .context("Failed to send launch pipeline request")?;

        self.handle_response(response).await
    }

    /// Latest run recorded for a key
    pub async fn get_run(&self, run_key: &str) -> Result<PipelineRun> {
        let url = format!("{}/pipeline/{}", self.base_url, run_key);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send get run request")?;

        self.handle_response(response).await
    }

    /// Every run recorded for a key, oldest first
    pub async fn get_history(&self, run_key: &str) -> Result<Vec<PipelineRun>> {
        let url = format!("{}/pipeline/{}/history", self.base_url, run_key);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send get history request")?;

        self.handle_response(response).await
    }

    /// Latest run of every key
    pub async fn list_runs(&self) -> Result<Vec<PipelineRun>> {
        let url = format!("{}/pipeline/list", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send list runs request")?;

        self.handle_response(response).await
    }

    /// Cancel an in-flight run
    pub async fn cancel_run(&self, run_key: &str) -> Result<CancelResponse> {
        let url = format!("{}/pipeline/{}/cancel", self.base_url, run_key);
        let response = self
            .client
            .post(&url)
            .send()
            .await
            .context("Failed to send cancel request")?;

        self.handle_response(response).await
    }

    /// Handle API response and deserialize JSON
    ///
    /// Error bodies from the service are unpacked so the remote platform's
    /// raw answer reaches the operator.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("{}", describe_failure(status.as_u16(), &error_text));
        }

        response
            .json()
            .await
            .context("Failed to parse response JSON")
    }
}

fn describe_failure(status: u16, body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(err) => {
            let mut message = format!("Request failed with status {}: {}", status, err.error);
            if let Some(code) = err.status_code {
                message.push_str(&format!("\n  remote status: {}", code));
            }
            if let Some(raw) = err.raw_content {
                message.push_str(&format!("\n  remote body:   {}", raw));
            }
            message
        }
        Err(_) => format!("Request failed with status {}: {}", status, body),
    }
}
