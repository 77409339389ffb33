//! Scripted [`TaskApi`] used by service tests

use async_trait::async_trait;
use ferry_client::{ClientError, Result, TaskApi};
use ferry_core::domain::task::{TaskHandle, TaskRequest, TaskSnapshot, TaskStatus};
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// How the next submission should be answered
#[derive(Debug, Clone)]
pub enum Submit {
    Id(&'static str),
    MissingId,
    Rejected(u16, &'static str),
}

/// How status lookups for a task should fail
#[derive(Debug, Clone, Copy)]
pub enum StatusFault {
    Decode(u16, &'static str),
    Rejected(u16, &'static str),
}

/// A fake remote that replays scripted answers
///
/// Status scripts are consumed front to back; the last entry repeats forever,
/// so `["RUNNING"]` models a task that never finishes.
#[derive(Default)]
pub struct ScriptedApi {
    submits: Mutex<VecDeque<Submit>>,
    statuses: Mutex<HashMap<String, VecDeque<&'static str>>>,
    faults: Mutex<HashMap<String, StatusFault>>,
    pub submitted: Mutex<Vec<TaskRequest>>,
    pub status_calls: Mutex<Vec<String>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_submit(self, answer: Submit) -> Self {
        self.submits.lock().unwrap().push_back(answer);
        self
    }

    pub fn on_status(self, task_id: &str, script: &[&'static str]) -> Self {
        self.statuses
            .lock()
            .unwrap()
            .insert(task_id.to_string(), script.iter().copied().collect());
        self
    }

    /// Every status lookup for `task_id` fails with `fault`
    pub fn on_status_fault(self, task_id: &str, fault: StatusFault) -> Self {
        self.faults
            .lock()
            .unwrap()
            .insert(task_id.to_string(), fault);
        self
    }

    pub fn submitted_apps(&self) -> Vec<String> {
        self.submitted
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.app.clone())
            .collect()
    }

    pub fn polls_for(&self, task_id: &str) -> usize {
        self.status_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|id| id.as_str() == task_id)
            .count()
    }
}

#[async_trait]
impl TaskApi for ScriptedApi {
    async fn submit(&self, request: &TaskRequest) -> Result<TaskHandle> {
        self.submitted.lock().unwrap().push(request.clone());
        let answer = self
            .submits
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected submission");

        match answer {
            Submit::Id(id) => Ok(TaskHandle {
                id: id.to_string(),
                status: Some(TaskStatus::Queued),
                raw: json!({ "id": id, "status": "QUEUED" }),
            }),
            Submit::MissingId => Err(ClientError::MissingTaskId {
                status: 200,
                raw: "{\"status\":\"DRAFT\"}".to_string(),
            }),
            Submit::Rejected(status, body) => Err(ClientError::rejected(status, body)),
        }
    }

    async fn get_status(&self, task_id: &str) -> Result<TaskSnapshot> {
        self.status_calls.lock().unwrap().push(task_id.to_string());
        match self.faults.lock().unwrap().get(task_id) {
            Some(StatusFault::Decode(status, body)) => {
                return Err(ClientError::decode(*status, *body));
            }
            Some(StatusFault::Rejected(status, body)) => {
                return Err(ClientError::rejected(*status, *body));
            }
            None => {}
        }

        let mut statuses = self.statuses.lock().unwrap();
        let script = statuses.get_mut(task_id).expect("unscripted task id");
        let status = if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            *script.front().expect("empty status script")
        };

        Ok(TaskSnapshot {
            id: task_id.to_string(),
            status: TaskStatus::from(status),
            payload: json!({ "id": task_id, "status": status }),
        })
    }

    async fn get_execution_details(&self, task_id: &str) -> Result<serde_json::Value> {
        Ok(json!({ "id": task_id, "jobs": [] }))
    }

    async fn list_apps(&self) -> Result<serde_json::Value> {
        Ok(json!({ "items": [] }))
    }
}
