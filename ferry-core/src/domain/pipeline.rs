//! Pipeline domain types
//!
//! A pipeline run drives one bucket through the fixed three-stage chain.
//! [`PipelineRun::apply`] is the state machine: every stage event goes through
//! it, and it refuses transitions the chain does not allow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Suffix appended to a bucket name to derive its run key
pub const RUN_KEY_SUFFIX: &str = "_transfer_pipeline";

/// Derives the ledger key for a bucket
pub fn run_key(bucket: &str) -> String {
    format!("{}{}", bucket, RUN_KEY_SUFFIX)
}

/// One of the three remote task templates, in chain order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    SourceManifest,
    Transfer,
    DestinationManifest,
}

impl Stage {
    pub const ALL: [Stage; 3] = [
        Stage::SourceManifest,
        Stage::Transfer,
        Stage::DestinationManifest,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::SourceManifest => "source_manifest",
            Stage::Transfer => "transfer",
            Stage::DestinationManifest => "destination_manifest",
        }
    }

    /// 1-based position in the chain
    pub fn position(&self) -> usize {
        match self {
            Stage::SourceManifest => 1,
            Stage::Transfer => 2,
            Stage::DestinationManifest => 3,
        }
    }

    pub fn next(&self) -> Option<Stage> {
        match self {
            Stage::SourceManifest => Some(Stage::Transfer),
            Stage::Transfer => Some(Stage::DestinationManifest),
            Stage::DestinationManifest => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What happened to a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageEventKind {
    /// The remote accepted the task
    Submitted,
    /// The remote reported COMPLETED
    Completed,
    /// The remote reported FAILED
    Failed,
    /// The poll budget ran out while the task was still non-terminal
    TimedOut,
    /// Submission or status lookup failed before a terminal status was seen
    Rejected,
    /// The run was cancelled
    Cancelled,
}

impl StageEventKind {
    pub fn is_failure(&self) -> bool {
        !matches!(self, StageEventKind::Submitted | StageEventKind::Completed)
    }
}

/// A single entry in a run's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageEvent {
    pub stage: Stage,
    pub task_id: Option<String>,
    pub kind: StageEventKind,
    pub detail: Option<String>,
    pub at: DateTime<Utc>,
}

impl StageEvent {
    pub fn new(stage: Stage, kind: StageEventKind) -> Self {
        Self {
            stage,
            task_id: None,
            kind,
            detail: None,
            at: Utc::now(),
        }
    }

    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Pipeline state machine
///
/// `Succeeded` stands for "stage 3 done". `Failed` is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Started,
    Stage1Submitted,
    Stage1Done,
    Stage2Submitted,
    Stage2Done,
    Stage3Submitted,
    Succeeded,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Succeeded | PipelineState::Failed)
    }

    pub fn outcome(&self) -> RunOutcome {
        match self {
            PipelineState::Succeeded => RunOutcome::Succeeded,
            PipelineState::Failed => RunOutcome::Failed,
            _ => RunOutcome::InProgress,
        }
    }

    fn submitted(stage: Stage) -> Self {
        match stage {
            Stage::SourceManifest => PipelineState::Stage1Submitted,
            Stage::Transfer => PipelineState::Stage2Submitted,
            Stage::DestinationManifest => PipelineState::Stage3Submitted,
        }
    }

    fn done(stage: Stage) -> Self {
        match stage {
            Stage::SourceManifest => PipelineState::Stage1Done,
            Stage::Transfer => PipelineState::Stage2Done,
            Stage::DestinationManifest => PipelineState::Succeeded,
        }
    }

    /// State a run must be in before `stage` may be submitted
    fn ready_for(stage: Stage) -> Self {
        match stage {
            Stage::SourceManifest => PipelineState::Started,
            Stage::Transfer => PipelineState::Stage1Done,
            Stage::DestinationManifest => PipelineState::Stage2Done,
        }
    }
}

/// Overall outcome of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunOutcome {
    InProgress,
    Succeeded,
    Failed,
}

/// A transition the state machine does not allow
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot record {kind:?} for stage {stage} in state {from:?}")]
pub struct TransitionError {
    pub from: PipelineState,
    pub stage: Stage,
    pub kind: StageEventKind,
}

/// One end-to-end execution of the chain for one bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRun {
    pub run_key: String,
    pub bucket: String,
    pub state: PipelineState,
    pub events: Vec<StageEvent>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Failure reason, copied from the failing event
    pub error: Option<String>,
}

impl PipelineRun {
    pub fn new(bucket: impl Into<String>) -> Self {
        let bucket = bucket.into();
        Self {
            run_key: run_key(&bucket),
            bucket,
            state: PipelineState::Started,
            events: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
            error: None,
        }
    }

    pub fn outcome(&self) -> RunOutcome {
        self.state.outcome()
    }

    /// Applies a stage event, advancing the state machine
    ///
    /// The event is appended only if the transition is legal.
    pub fn apply(&mut self, event: StageEvent) -> Result<PipelineState, TransitionError> {
        let refused = TransitionError {
            from: self.state,
            stage: event.stage,
            kind: event.kind,
        };

        let next = match event.kind {
            StageEventKind::Submitted => {
                if self.state != PipelineState::ready_for(event.stage) {
                    return Err(refused);
                }
                PipelineState::submitted(event.stage)
            }
            StageEventKind::Completed => {
                if self.state != PipelineState::submitted(event.stage) {
                    return Err(refused);
                }
                PipelineState::done(event.stage)
            }
            _ => {
                if self.state.is_terminal() {
                    return Err(refused);
                }
                PipelineState::Failed
            }
        };

        if event.kind.is_failure() {
            self.error = Some(
                event
                    .detail
                    .clone()
                    .unwrap_or_else(|| format!("stage {} {:?}", event.stage, event.kind)),
            );
        }

        self.state = next;
        if next.is_terminal() {
            self.finished_at = Some(event.at);
        }
        self.events.push(event);

        Ok(next)
    }

    /// Marks a run that stopped without a terminal event as failed
    ///
    /// No event is appended. Returns false when the run had already finished.
    pub fn close(&mut self, reason: impl Into<String>) -> bool {
        if self.state.is_terminal() {
            return false;
        }

        self.state = PipelineState::Failed;
        self.error = Some(reason.into());
        self.finished_at = Some(Utc::now());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submitted(stage: Stage, id: &str) -> StageEvent {
        StageEvent::new(stage, StageEventKind::Submitted).with_task_id(id)
    }

    fn completed(stage: Stage, id: &str) -> StageEvent {
        StageEvent::new(stage, StageEventKind::Completed).with_task_id(id)
    }

    #[test]
    fn test_run_key_appends_suffix() {
        assert_eq!(run_key("acme-data"), "acme-data_transfer_pipeline");
        assert_eq!(PipelineRun::new("acme-data").run_key, run_key("acme-data"));
    }

    #[test]
    fn test_full_chain_reaches_succeeded() {
        let mut run = PipelineRun::new("acme-data");
        for (stage, id) in Stage::ALL.iter().zip(["t1", "t2", "t3"]) {
            run.apply(submitted(*stage, id)).unwrap();
            run.apply(completed(*stage, id)).unwrap();
        }

        assert_eq!(run.state, PipelineState::Succeeded);
        assert_eq!(run.outcome(), RunOutcome::Succeeded);
        assert_eq!(run.events.len(), 6);
        assert!(run.finished_at.is_some());
        assert!(run.error.is_none());
    }

    #[test]
    fn test_stage_cannot_be_submitted_before_prior_completes() {
        let mut run = PipelineRun::new("acme-data");
        run.apply(submitted(Stage::SourceManifest, "t1")).unwrap();

        let err = run.apply(submitted(Stage::Transfer, "t2")).unwrap_err();
        assert_eq!(err.from, PipelineState::Stage1Submitted);
        assert_eq!(run.events.len(), 1);
    }

    #[test]
    fn test_failed_is_absorbing() {
        let mut run = PipelineRun::new("acme-data");
        run.apply(submitted(Stage::SourceManifest, "t1")).unwrap();
        run.apply(
            StageEvent::new(Stage::SourceManifest, StageEventKind::Failed)
                .with_task_id("t1")
                .with_detail("remote reported FAILED"),
        )
        .unwrap();

        assert_eq!(run.outcome(), RunOutcome::Failed);
        assert_eq!(run.error.as_deref(), Some("remote reported FAILED"));

        assert!(run.apply(submitted(Stage::Transfer, "t2")).is_err());
        assert!(
            run.apply(StageEvent::new(Stage::Transfer, StageEventKind::Cancelled))
                .is_err()
        );
        assert_eq!(run.events.len(), 2);
    }

    #[test]
    fn test_completion_requires_matching_submission() {
        let mut run = PipelineRun::new("acme-data");
        assert!(run.apply(completed(Stage::SourceManifest, "t1")).is_err());
        assert_eq!(run.state, PipelineState::Started);
    }

    #[test]
    fn test_stage_order() {
        assert_eq!(Stage::SourceManifest.next(), Some(Stage::Transfer));
        assert_eq!(Stage::Transfer.next(), Some(Stage::DestinationManifest));
        assert_eq!(Stage::DestinationManifest.next(), None);
        assert_eq!(Stage::DestinationManifest.position(), 3);
    }

    #[test]
    fn test_close_seals_unfinished_run() {
        let mut run = PipelineRun::new("acme-data");
        run.apply(submitted(Stage::SourceManifest, "t1")).unwrap();

        assert!(run.close("abandoned"));
        assert_eq!(run.state, PipelineState::Failed);
        assert_eq!(run.outcome(), RunOutcome::Failed);
        assert_eq!(run.error.as_deref(), Some("abandoned"));
        assert!(run.finished_at.is_some());
        assert_eq!(run.events.len(), 1);
    }

    #[test]
    fn test_close_leaves_finished_run_alone() {
        let mut run = PipelineRun::new("acme-data");
        for (i, stage) in Stage::ALL.iter().enumerate() {
            let id = format!("t{i}");
            run.apply(submitted(*stage, &id)).unwrap();
            run.apply(completed(*stage, &id)).unwrap();
        }
        let finished_at = run.finished_at;

        assert!(!run.close("abandoned"));
        assert_eq!(run.state, PipelineState::Succeeded);
        assert!(run.error.is_none());
        assert_eq!(run.finished_at, finished_at);
    }

    #[test]
    fn test_transition_error_message() {
        let mut run = PipelineRun::new("acme-data");
        let err = run
            .apply(StageEvent::new(Stage::Transfer, StageEventKind::Completed))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot record Completed for stage transfer in state Started"
        );
    }

}
