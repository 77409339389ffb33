//! Data Transfer Objects for the service surface
//!
//! This module contains the request and response bodies exchanged between
//! the orchestrator service and its callers (the CLI, scripts, other services).
//! Field names are camelCase on the wire.

pub mod error;
pub mod pipeline;
pub mod task;
