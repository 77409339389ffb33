//! Pipeline DTOs

use serde::{Deserialize, Serialize};

use crate::domain::pipeline::{PipelineState, RunOutcome, Stage};
use crate::domain::task::TaskStatus;

/// Request to run the chain for one bucket
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartPipeline {
    /// Falls back to the configured default bucket
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default)]
    pub alternate_dataset: bool,
    /// The transfer job already exists remotely and only needs to run
    #[serde(default)]
    pub transfer_job_exists: bool,
}

/// Acknowledgement returned by a detached launch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchAck {
    pub message: String,
    pub run_key: String,
}

/// Final result of a synchronous run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReport {
    pub run_key: String,
    pub bucket: String,
    pub state: PipelineState,
    pub outcome: RunOutcome,
    pub stages: Vec<StageReport>,
}

/// Terminal observation of one stage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageReport {
    pub stage: Stage,
    pub task_id: String,
    pub status: TaskStatus,
    pub payload: serde_json::Value,
}

/// Response to a cancellation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelResponse {
    pub run_key: String,
    pub cancelled: bool,
}
