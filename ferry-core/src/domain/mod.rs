//! Core domain types
//!
//! This module contains the core domain structures used across Ferry crates.
//! Task types mirror the remote execution platform, pipeline types describe
//! the fixed three-stage chain the orchestrator drives.

pub mod credentials;
pub mod pipeline;
pub mod task;
