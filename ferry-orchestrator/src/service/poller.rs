//! Completion poller
//!
//! The remote platform has no push notifications, so a submitted task is
//! watched by asking for its status at a fixed interval. The wait between
//! polls is a tokio timer raced against the run's cancellation token, so a
//! stuck task only holds its own run, and only for a bounded time.

use ferry_client::{ClientError, TaskApi};
use ferry_core::domain::task::TaskStatus;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Completion poller settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Wait between two status requests
    pub interval: Duration,
    /// Number of status requests before giving up
    pub max_attempts: u32,
}

impl PollSettings {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(20);
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 15;

    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INTERVAL, Self::DEFAULT_MAX_ATTEMPTS)
    }
}

/// A task that reached `COMPLETED` or `FAILED`
#[derive(Debug, Clone)]
pub struct TerminalTask {
    pub status: TaskStatus,
    pub payload: serde_json::Value,
    /// Status requests issued, including the terminal one
    pub attempts: u32,
}

/// Why polling stopped without a terminal status
#[derive(Debug, Error)]
pub enum PollError {
    #[error("task {task_id} still not finished after {attempts} polls")]
    Timeout {
        task_id: String,
        attempts: u32,
        /// Last status body observed
        last_payload: serde_json::Value,
    },

    #[error("status lookup failed: {0}")]
    Client(#[from] ClientError),

    #[error("polling of task {task_id} was cancelled")]
    Cancelled { task_id: String },
}

/// Polls `task_id` until it reaches a terminal status
///
/// Returns right after the terminal poll, without sleeping again. Fails with
/// [`PollError::Timeout`] on exactly the `max_attempts`-th non-terminal poll.
pub async fn await_completion(
    api: &dyn TaskApi,
    task_id: &str,
    settings: &PollSettings,
    cancel: &CancellationToken,
) -> Result<TerminalTask, PollError> {
    let max_attempts = settings.max_attempts.max(1);
    let cancelled = || PollError::Cancelled {
        task_id: task_id.to_string(),
    };

    let mut attempt = 0;
    loop {
        attempt += 1;

        let snapshot = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled()),
            result = api.get_status(task_id) => result?,
        };

        debug!(
            task_id,
            attempt,
            status = %snapshot.status,
            "Polled task status"
        );

        if snapshot.status.is_terminal() {
            return Ok(TerminalTask {
                status: snapshot.status,
                payload: snapshot.payload,
                attempts: attempt,
            });
        }

        if attempt >= max_attempts {
            return Err(PollError::Timeout {
                task_id: task_id.to_string(),
                attempts: attempt,
                last_payload: snapshot.payload,
            });
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled()),
            _ = tokio::time::sleep(settings.interval) => {}
        }
    }
}
