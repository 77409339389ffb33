//! Ferry remote task client
//!
//! A small, typed HTTP client for the task API of the remote execution platform.
//!
//! The orchestrator only depends on the [`TaskApi`] trait, so tests can swap in
//! a scripted implementation. [`HttpTaskClient`] is the real one.
//!
//! # Example
//!
//! ```no_run
//! use ferry_client::{HttpTaskClient, TaskApi};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = HttpTaskClient::new("https://api.sbgenomics.com/v2", "token");
//!
//!     let snapshot = client.get_status("task-id").await?;
//!     println!("task {} is {}", snapshot.id, snapshot.status);
//!     Ok(())
//! }
//! ```

pub mod error;
mod apps;
mod tasks;

// Re-export commonly used types
pub use error::{ClientError, Result};

use async_trait::async_trait;
use ferry_core::domain::task::{TaskHandle, TaskRequest, TaskSnapshot};
use reqwest::Client;
use reqwest::header::ACCEPT;

/// Header carrying the platform auth token
pub const AUTH_HEADER: &str = "X-SBG-Auth-Token";

/// Operations the orchestrator needs from the remote task API
///
/// Each call issues exactly one request. Retrying is the caller's decision.
#[async_trait]
pub trait TaskApi: Send + Sync {
    /// Submits a task and asks the remote to run it
    async fn submit(&self, request: &TaskRequest) -> Result<TaskHandle>;

    /// Fetches the current status of a task
    async fn get_status(&self, task_id: &str) -> Result<TaskSnapshot>;

    /// Fetches the execution details of a task
    async fn get_execution_details(&self, task_id: &str) -> Result<serde_json::Value>;

    /// Lists the apps visible to the token
    async fn list_apps(&self) -> Result<serde_json::Value>;
}

/// HTTP client for the remote task API
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct HttpTaskClient {
    /// Base URL of the API (e.g., "https://api.sbgenomics.com/v2")
    base_url: String,
    /// Platform auth token
    auth_token: String,
    /// HTTP client instance
    client: Client,
}

impl HttpTaskClient {
    /// Create a new task client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the task API
    /// * `auth_token` - Token sent in the `X-SBG-Auth-Token` header
    pub fn new(base_url: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self::with_client(base_url, auth_token, Client::new())
    }

    /// Create a new task client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    ///
    /// # Example
    /// ```
    /// use ferry_client::HttpTaskClient;
    /// use reqwest::Client;
    /// use std::time::Duration;
    ///
    /// let http_client = Client::builder()
    ///     .timeout(Duration::from_secs(30))
    ///     .build()
    ///     .unwrap();
    ///
    /// let client = HttpTaskClient::with_client("https://api.example.com/v2", "token", http_client);
    /// ```
    pub fn with_client(
        base_url: impl Into<String>,
        auth_token: impl Into<String>,
        client: Client,
    ) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token: auth_token.into(),
            client,
        }
    }

    /// Get the base URL of the task API
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .header(AUTH_HEADER, &self.auth_token)
            .header(ACCEPT, "application/json")
    }

    fn post(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .header(AUTH_HEADER, &self.auth_token)
            .header(ACCEPT, "application/json")
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Read a response body as JSON without ever losing the raw text
    ///
    /// Non-success statuses become [`ClientError::Rejected`], unparseable
    /// success bodies become [`ClientError::Decode`].
    async fn handle_response(
        &self,
        response: reqwest::Response,
    ) -> Result<(u16, serde_json::Value)> {
        let status = response.status().as_u16();
        let raw = response.text().await?;
        decode_body(status, raw)
    }
}

/// Split a response into success JSON or a tagged error
pub(crate) fn decode_body(status: u16, raw: String) -> Result<(u16, serde_json::Value)> {
    if !(200..300).contains(&status) {
        return Err(ClientError::rejected(status, raw));
    }

    match serde_json::from_str(&raw) {
        Ok(value) => Ok((status, value)),
        Err(e) => {
            tracing::warn!("Remote returned undecodable body (status {}): {}", status, e);
            Err(ClientError::decode(status, raw))
        }
    }
}
