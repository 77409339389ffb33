//! Pipeline Service
//!
//! Sequences the three stages for one bucket: submit, wait for a terminal
//! status, move on. The first failure of any kind ends the run; nothing is
//! resubmitted. Every transition is written to the job ledger.
//!
//! Runs execute either synchronously ([`PipelineOrchestrator::run`]) or
//! detached ([`PipelineOrchestrator::launch`]). Both drive the chain on a
//! spawned tokio task, so a run outlives a caller that stops waiting. A
//! detached run reports only through the ledger.

use ferry_client::{ClientError, TaskApi};
use ferry_core::domain::credentials::{Credentials, Dataset};
use ferry_core::domain::pipeline::{
    PipelineState, RunOutcome, Stage, StageEvent, StageEventKind, run_key,
};
use ferry_core::domain::task::{TaskHandle, TaskRequest, TaskStatus};
use ferry_core::dto::pipeline::{LaunchAck, PipelineReport, StageReport};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::repository::JobLedger;
use crate::service::poller::{PollError, PollSettings, await_completion};
use crate::service::stages::StageTemplates;

/// What to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineRequest {
    pub bucket: String,
    pub dataset: Dataset,
    /// The transfer job is already provisioned remotely
    pub transfer_job_exists: bool,
}

impl PipelineRequest {
    pub fn new(bucket: impl Into<String>, dataset: Dataset) -> Self {
        Self {
            bucket: bucket.into(),
            dataset,
            transfer_job_exists: false,
        }
    }

    pub fn with_existing_transfer_job(mut self, exists: bool) -> Self {
        self.transfer_job_exists = exists;
        self
    }

    pub fn run_key(&self) -> String {
        run_key(&self.bucket)
    }
}

/// Service error type
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("a run for {0} is already in progress")]
    AlreadyRunning(String),

    #[error("stage {stage} submission was rejected: {source}")]
    Submission { stage: Stage, source: ClientError },

    #[error("stage {stage} submission returned no task id")]
    MissingJobIdentifier { stage: Stage, status: u16, raw: String },

    #[error("stage {stage} could not reach the remote API: {source}")]
    Transport { stage: Stage, source: ClientError },

    #[error("stage {stage} status lookup for task {task_id} failed: {source}")]
    StatusLookup {
        stage: Stage,
        task_id: String,
        source: ClientError,
    },

    #[error("stage {stage} task {task_id} did not finish within {attempts} polls")]
    PollTimeout {
        stage: Stage,
        task_id: String,
        attempts: u32,
    },

    #[error("stage {stage} task {task_id} reported FAILED: {reason}")]
    StageFailure {
        stage: Stage,
        task_id: String,
        reason: String,
        payload: serde_json::Value,
    },

    #[error("stage {stage} was cancelled")]
    Cancelled { stage: Stage },

    #[error("pipeline task aborted: {0}")]
    Aborted(String),
}

impl PipelineError {
    /// Raw remote response text, when the failure carries one
    pub fn raw_content(&self) -> Option<&str> {
        match self {
            Self::Submission { source, .. }
            | Self::Transport { source, .. }
            | Self::StatusLookup { source, .. } => source.raw_content(),
            Self::MissingJobIdentifier { raw, .. } => Some(raw),
            _ => None,
        }
    }

    /// Remote HTTP status code, when the failure carries one
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Submission { source, .. }
            | Self::Transport { source, .. }
            | Self::StatusLookup { source, .. } => source.status_code(),
            Self::MissingJobIdentifier { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Stage the failure happened in, if any
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Submission { stage, .. }
            | Self::MissingJobIdentifier { stage, .. }
            | Self::Transport { stage, .. }
            | Self::StatusLookup { stage, .. }
            | Self::PollTimeout { stage, .. }
            | Self::StageFailure { stage, .. }
            | Self::Cancelled { stage } => Some(*stage),
            Self::AlreadyRunning(_) | Self::Aborted(_) => None,
        }
    }

    fn event_kind(&self) -> StageEventKind {
        match self {
            Self::PollTimeout { .. } => StageEventKind::TimedOut,
            Self::StageFailure { .. } => StageEventKind::Failed,
            Self::Cancelled { .. } => StageEventKind::Cancelled,
            _ => StageEventKind::Rejected,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

type ActiveRuns = Arc<Mutex<HashMap<String, CancellationToken>>>;

fn lock(active: &ActiveRuns) -> MutexGuard<'_, HashMap<String, CancellationToken>> {
    active.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Reason stored on a run whose task ended without a terminal event
const RUN_ABANDONED: &str = "run ended without reaching a terminal state";

/// Registration of an in-flight run, released on drop
///
/// Dropping it closes the ledger run before the key is freed, so a panic or a
/// runtime shutdown never leaves a run in progress.
struct ActiveRun {
    run_key: String,
    token: CancellationToken,
    active: ActiveRuns,
    ledger: Arc<dyn JobLedger>,
}

impl Drop for ActiveRun {
    fn drop(&mut self) {
        match self.ledger.finish(&self.run_key, RUN_ABANDONED) {
            Ok(run) if run.error.as_deref() == Some(RUN_ABANDONED) => {
                warn!(run_key = %self.run_key, state = ?run.state, "Closed abandoned pipeline run");
            }
            Ok(_) => {}
            Err(e) => error!(run_key = %self.run_key, "Could not close pipeline run: {}", e),
        }
        lock(&self.active).remove(&self.run_key);
    }
}

/// Drives pipeline runs against the remote task API
pub struct PipelineOrchestrator {
    api: Arc<dyn TaskApi>,
    ledger: Arc<dyn JobLedger>,
    templates: StageTemplates,
    credentials: Credentials,
    poll: PollSettings,
    shutdown: CancellationToken,
    active: ActiveRuns,
}

impl PipelineOrchestrator {
    pub fn new(
        api: Arc<dyn TaskApi>,
        ledger: Arc<dyn JobLedger>,
        templates: StageTemplates,
        credentials: Credentials,
        poll: PollSettings,
    ) -> Self {
        Self {
            api,
            ledger,
            templates,
            credentials,
            poll,
            shutdown: CancellationToken::new(),
            active: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Uses `token` as the parent of every run token
    ///
    /// Cancelling it aborts all in-flight runs.
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Runs the chain and waits for the outcome
    ///
    /// The chain itself runs on a spawned task. Dropping the returned future
    /// stops the wait, not the run.
    pub async fn run(self: &Arc<Self>, request: PipelineRequest) -> Result<PipelineReport> {
        let active = self.register(&request)?;
        let run_key = active.run_key.clone();

        let orchestrator = Arc::clone(self);
        let handle = tokio::spawn(async move { orchestrator.drive(&request, &active.token).await });

        match handle.await {
            Ok(result) => result,
            Err(e) => {
                error!(run_key = %run_key, "Pipeline task aborted: {}", e);
                Err(PipelineError::Aborted(e.to_string()))
            }
        }
    }

    /// Starts the chain in the background and returns immediately
    ///
    /// The caller learns about the outcome only by reading the ledger.
    pub fn launch(self: &Arc<Self>, request: PipelineRequest) -> Result<LaunchAck> {
        let active = self.register(&request)?;
        let ack = LaunchAck {
            message: format!("pipeline started for bucket {}", request.bucket),
            run_key: active.run_key.clone(),
        };

        let orchestrator = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = orchestrator.drive(&request, &active.token).await {
                error!(run_key = %active.run_key, "Detached pipeline failed: {}", e);
            }
        });

        Ok(ack)
    }

    /// Cancels an in-flight run
    ///
    /// Returns false when no run is in flight for the key.
    pub fn cancel(&self, run_key: &str) -> bool {
        match lock(&self.active).get(run_key) {
            Some(token) => {
                info!(run_key, "Cancelling pipeline");
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Whether a run is in flight for the key
    pub fn is_active(&self, run_key: &str) -> bool {
        lock(&self.active).contains_key(run_key)
    }

    /// Submits a single stage without polling or ledger bookkeeping
    pub async fn submit_stage(
        &self,
        stage: Stage,
        request: &PipelineRequest,
    ) -> std::result::Result<TaskHandle, ClientError> {
        let task = self.build(stage, request);
        self.api.submit(&task).await
    }

    fn build(&self, stage: Stage, request: &PipelineRequest) -> TaskRequest {
        self.templates.build(
            stage,
            &request.bucket,
            request.dataset,
            &self.credentials,
            request.transfer_job_exists,
        )
    }

    fn register(&self, request: &PipelineRequest) -> Result<ActiveRun> {
        let run_key = request.run_key();
        let token = {
            let mut runs = lock(&self.active);
            if runs.contains_key(&run_key) {
                return Err(PipelineError::AlreadyRunning(run_key));
            }
            let token = self.shutdown.child_token();
            runs.insert(run_key.clone(), token.clone());
            token
        };

        self.ledger.begin(&request.bucket);
        info!(run_key = %run_key, bucket = %request.bucket, dataset = ?request.dataset, "Pipeline started");

        Ok(ActiveRun {
            run_key,
            token,
            active: Arc::clone(&self.active),
            ledger: Arc::clone(&self.ledger),
        })
    }

    async fn drive(
        &self,
        request: &PipelineRequest,
        token: &CancellationToken,
    ) -> Result<PipelineReport> {
        let run_key = request.run_key();
        let mut stages = Vec::with_capacity(Stage::ALL.len());

        for stage in Stage::ALL {
            let report = self.run_stage(&run_key, request, stage, token).await?;
            stages.push(report);
        }

        info!(run_key = %run_key, "Pipeline succeeded");

        Ok(PipelineReport {
            run_key,
            bucket: request.bucket.clone(),
            state: PipelineState::Succeeded,
            outcome: RunOutcome::Succeeded,
            stages,
        })
    }

    async fn run_stage(
        &self,
        run_key: &str,
        request: &PipelineRequest,
        stage: Stage,
        token: &CancellationToken,
    ) -> Result<StageReport> {
        let task = self.build(stage, request);

        let submitted = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            result = self.api.submit(&task) => Some(result),
        };

        let handle = match submitted {
            Some(Ok(handle)) => handle,
            Some(Err(e)) => return Err(self.fail(run_key, None, submission_error(stage, e))),
            None => return Err(self.fail(run_key, None, PipelineError::Cancelled { stage })),
        };

        self.track(
            run_key,
            StageEvent::new(stage, StageEventKind::Submitted).with_task_id(handle.id.clone()),
        );
        info!(run_key, %stage, task_id = %handle.id, "Stage submitted");

        let task_id = handle.id;
        match await_completion(self.api.as_ref(), &task_id, &self.poll, token).await {
            Ok(done) if done.status == TaskStatus::Completed => {
                self.track(
                    run_key,
                    StageEvent::new(stage, StageEventKind::Completed).with_task_id(task_id.clone()),
                );
                info!(run_key, %stage, task_id = %task_id, polls = done.attempts, "Stage completed");

                Ok(StageReport {
                    stage,
                    task_id,
                    status: done.status,
                    payload: done.payload,
                })
            }
            Ok(done) => {
                let err = PipelineError::StageFailure {
                    stage,
                    task_id: task_id.clone(),
                    reason: failure_reason(&done.payload),
                    payload: done.payload,
                };
                Err(self.fail(run_key, Some(&task_id), err))
            }
            Err(PollError::Timeout { attempts, .. }) => {
                let err = PipelineError::PollTimeout {
                    stage,
                    task_id: task_id.clone(),
                    attempts,
                };
                Err(self.fail(run_key, Some(&task_id), err))
            }
            Err(PollError::Client(source)) => {
                let err = if source.is_transport() {
                    PipelineError::Transport { stage, source }
                } else {
                    PipelineError::StatusLookup {
                        stage,
                        task_id: task_id.clone(),
                        source,
                    }
                };
                Err(self.fail(run_key, Some(&task_id), err))
            }
            Err(PollError::Cancelled { .. }) => {
                Err(self.fail(run_key, Some(&task_id), PipelineError::Cancelled { stage }))
            }
        }
    }

    /// Records the failing event and hands the error back
    fn fail(&self, run_key: &str, task_id: Option<&str>, err: PipelineError) -> PipelineError {
        let Some(stage) = err.stage() else {
            return err;
        };

        let mut event = StageEvent::new(stage, err.event_kind()).with_detail(err.to_string());
        if let Some(task_id) = task_id {
            event = event.with_task_id(task_id);
        }

        self.track(run_key, event);
        warn!(run_key, %stage, "Pipeline failed: {}", err);

        err
    }

    /// Appends an event to the ledger
    ///
    /// A refused write is logged and the run carries on: the remote task is
    /// already running and still has to be watched.
    fn track(&self, run_key: &str, event: StageEvent) {
        let stage = event.stage;
        let kind = event.kind;
        let task_id = event.task_id.clone();
        if let Err(e) = self.ledger.record(run_key, event) {
            error!(
                run_key,
                %stage,
                ?kind,
                task_id = task_id.as_deref().unwrap_or("-"),
                "Could not record stage event: {}",
                e
            );
        }
    }
}

fn submission_error(stage: Stage, source: ClientError) -> PipelineError {
    match source {
        ClientError::MissingTaskId { status, raw } => {
            PipelineError::MissingJobIdentifier { stage, status, raw }
        }
        source if source.is_transport() => PipelineError::Transport { stage, source },
        source => PipelineError::Submission { stage, source },
    }
}

/// Best-effort extraction of the remote failure message
fn failure_reason(payload: &serde_json::Value) -> String {
    payload
        .pointer("/execution_status/message")
        .or_else(|| payload.get("message"))
        .and_then(|v| v.as_str())
        .unwrap_or("no reason reported")
        .to_string()
}
