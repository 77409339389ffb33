//! Service Module
//!
//! Business logic layer for the orchestrator.
//! Stage builders and the completion poller are pure building blocks;
//! the pipeline service sequences them against the remote task API.

pub mod pipeline;
pub mod poller;
pub mod stages;

#[cfg(test)]
pub(crate) mod testing;

// Re-export for convenience
pub use pipeline::{PipelineError, PipelineOrchestrator, PipelineRequest};
