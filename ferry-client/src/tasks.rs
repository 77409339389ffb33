//! Task endpoints and the [`TaskApi`] implementation

use async_trait::async_trait;
use ferry_core::domain::task::{TaskHandle, TaskRequest, TaskSnapshot, TaskStatus};

use crate::error::{ClientError, Result};
use crate::{HttpTaskClient, TaskApi};

#[async_trait]
impl TaskApi for HttpTaskClient {
    async fn submit(&self, request: &TaskRequest) -> Result<TaskHandle> {
        let url = format!("{}/tasks", self.base_url);
        tracing::debug!("Submitting task '{}' (app {})", request.name, request.app);

        let response = self
            .post(&url)
            .query(&[("action", "run")])
            .json(request)
            .send()
            .await?;

        let (status, body) = self.handle_response(response).await?;
        parse_handle(status, body)
    }

    async fn get_status(&self, task_id: &str) -> Result<TaskSnapshot> {
        let url = format!("{}/tasks/{}", self.base_url, task_id);
        let response = self.get(&url).send().await?;

        let (status, body) = self.handle_response(response).await?;
        parse_snapshot(task_id, status, body)
    }

    async fn get_execution_details(&self, task_id: &str) -> Result<serde_json::Value> {
        let url = format!("{}/tasks/{}/execution_details", self.base_url, task_id);
        let response = self.get(&url).send().await?;

        let (_, body) = self.handle_response(response).await?;
        Ok(body)
    }

    async fn list_apps(&self) -> Result<serde_json::Value> {
        self.fetch_apps().await
    }
}

/// Extract the task handle from a submission response
pub(crate) fn parse_handle(status: u16, body: serde_json::Value) -> Result<TaskHandle> {
    let id = match body.get("id").and_then(|v| v.as_str()) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => {
            return Err(ClientError::MissingTaskId {
                status,
                raw: body.to_string(),
            });
        }
    };

    let task_status = body
        .get("status")
        .and_then(|v| v.as_str())
        .map(TaskStatus::from);

    Ok(TaskHandle {
        id,
        status: task_status,
        raw: body,
    })
}

/// Extract the status from a task body, keeping the full payload
pub(crate) fn parse_snapshot(
    task_id: &str,
    status: u16,
    body: serde_json::Value,
) -> Result<TaskSnapshot> {
    let Some(task_status) = body.get("status").and_then(|v| v.as_str()) else {
        return Err(ClientError::decode(status, body.to_string()));
    };

    Ok(TaskSnapshot {
        id: task_id.to_string(),
        status: TaskStatus::from(task_status),
        payload: body,
    })
}
