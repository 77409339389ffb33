//! App listing endpoint

use crate::HttpTaskClient;
use crate::error::Result;

impl HttpTaskClient {
    /// List the apps visible to the configured token
    ///
    /// The body is returned as-is; the orchestrator has no use for the
    /// individual fields.
    pub(crate) async fn fetch_apps(&self) -> Result<serde_json::Value> {
        let url = format!("{}/apps", self.base_url);
        let response = self.get(&url).send().await?;

        let (_, body) = self.handle_response(response).await?;
        Ok(body)
    }
}
