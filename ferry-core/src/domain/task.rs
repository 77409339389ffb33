//! Remote task domain types
//!
//! These types mirror the task resource of the remote execution platform.
//! A [`TaskRequest`] is what gets submitted, a [`TaskHandle`] is what comes back,
//! and a [`TaskSnapshot`] is one observation of a running task.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Submission payload for a single remote task
///
/// Built fresh per stage and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRequest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub app: String,
    pub project: String,
    pub inputs: BTreeMap<String, InputValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_settings: Option<ExecutionSettings>,
}

/// A single task input value
///
/// The remote apps only take plain strings and flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputValue {
    Text(String),
    Flag(bool),
}

impl InputValue {
    /// Returns the string value, if this input is text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            InputValue::Text(s) => Some(s),
            InputValue::Flag(_) => None,
        }
    }
}

impl From<&str> for InputValue {
    fn from(value: &str) -> Self {
        InputValue::Text(value.to_string())
    }
}

impl From<String> for InputValue {
    fn from(value: String) -> Self {
        InputValue::Text(value)
    }
}

impl From<bool> for InputValue {
    fn from(value: bool) -> Self {
        InputValue::Flag(value)
    }
}

/// Optional execution flags attached to a submission
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionSettings {
    /// `Some(false)` disables reuse of cached results on the remote side
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_memoization: Option<bool>,
}

/// Result of a successful submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskHandle {
    /// Remote task identifier, the only field later stages depend on
    pub id: String,
    /// Initial status, when the remote reported one
    pub status: Option<TaskStatus>,
    /// Full response body as returned by the remote API
    pub raw: serde_json::Value,
}

/// Remote task status
///
/// The remote vocabulary is not fully enumerable, so anything other than the
/// known strings is kept verbatim in [`TaskStatus::Other`] and treated as
/// non-terminal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Other(String),
}

impl TaskStatus {
    /// Whether polling should stop on this status
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    pub fn as_str(&self) -> &str {
        match self {
            TaskStatus::Queued => "QUEUED",
            TaskStatus::Running => "RUNNING",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Failed => "FAILED",
            TaskStatus::Other(s) => s,
        }
    }
}

impl From<&str> for TaskStatus {
    fn from(value: &str) -> Self {
        match value {
            "QUEUED" => TaskStatus::Queued,
            "RUNNING" => TaskStatus::Running,
            "COMPLETED" => TaskStatus::Completed,
            "FAILED" => TaskStatus::Failed,
            other => TaskStatus::Other(other.to_string()),
        }
    }
}

impl From<String> for TaskStatus {
    fn from(value: String) -> Self {
        TaskStatus::from(value.as_str())
    }
}

impl From<TaskStatus> for String {
    fn from(status: TaskStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observation of a remote task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub id: String,
    pub status: TaskStatus,
    /// Full status body as returned by the remote API
    pub payload: serde_json::Value,
}
