//! Job ledger
//!
//! Process-local history of pipeline runs, keyed by run key. It is a
//! debugging aid: nothing is persisted and nothing is evicted. The remote
//! platform stays authoritative for task outcomes.

use ferry_core::domain::pipeline::{PipelineRun, PipelineState, StageEvent, TransitionError};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Ledger error type
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("no run recorded for key {0}")]
    NotFound(String),

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// Storage for pipeline run history
///
/// `record` must keep per-key ordering under concurrent writers; there is no
/// ordering requirement across keys.
pub trait JobLedger: Send + Sync {
    /// Starts a new run for `bucket` and returns it
    ///
    /// Earlier runs for the same key stay available through [`JobLedger::history`].
    fn begin(&self, bucket: &str) -> PipelineRun;

    /// Appends an event to the latest run for `run_key`
    fn record(&self, run_key: &str, event: StageEvent) -> Result<PipelineState, LedgerError>;

    /// Closes the latest run for `run_key`
    ///
    /// A run still in progress is marked failed with `reason`; a run that
    /// already reached a terminal state is returned unchanged.
    fn finish(&self, run_key: &str, reason: &str) -> Result<PipelineRun, LedgerError>;

    /// Latest run for `run_key`
    fn get(&self, run_key: &str) -> Option<PipelineRun>;

    /// Every run recorded for `run_key`, oldest first
    fn history(&self, run_key: &str) -> Vec<PipelineRun>;

    /// Latest run of every key, most recently started first
    fn list(&self) -> Vec<PipelineRun>;
}

/// In-memory implementation of JobLedger
///
/// A single mutex serializes writers, which is plenty for a handful of runs
/// that each append a few events per minute.
#[derive(Default)]
pub struct InMemoryLedger {
    runs: Mutex<HashMap<String, Vec<PipelineRun>>>,
}

impl InMemoryLedger {
    /// Creates an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    fn runs(&self) -> MutexGuard<'_, HashMap<String, Vec<PipelineRun>>> {
        // entries are only mutated through PipelineRun::apply, which leaves
        // them consistent even if a holder panicked
        self.runs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl JobLedger for InMemoryLedger {
    fn begin(&self, bucket: &str) -> PipelineRun {
        let run = PipelineRun::new(bucket);
        self.runs()
            .entry(run.run_key.clone())
            .or_default()
            .push(run.clone());
        run
    }

    fn record(&self, run_key: &str, event: StageEvent) -> Result<PipelineState, LedgerError> {
        let mut runs = self.runs();
        let run = runs
            .get_mut(run_key)
            .and_then(|history| history.last_mut())
            .ok_or_else(|| LedgerError::NotFound(run_key.to_string()))?;

        Ok(run.apply(event)?)
    }

    fn finish(&self, run_key: &str, reason: &str) -> Result<PipelineRun, LedgerError> {
        let mut runs = self.runs();
        let run = runs
            .get_mut(run_key)
            .and_then(|history| history.last_mut())
            .ok_or_else(|| LedgerError::NotFound(run_key.to_string()))?;

        run.close(reason);
        Ok(run.clone())
    }

    fn get(&self, run_key: &str) -> Option<PipelineRun> {
        self.runs()
            .get(run_key)
            .and_then(|history| history.last())
            .cloned()
    }

    fn history(&self, run_key: &str) -> Vec<PipelineRun> {
        self.runs().get(run_key).cloned().unwrap_or_default()
    }

    fn list(&self) -> Vec<PipelineRun> {
        let mut latest: Vec<PipelineRun> = self
            .runs()
            .values()
            .filter_map(|history| history.last().cloned())
            .collect();
        latest.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        latest
    }
}
