//! Repository Module
//!
//! Storage layer for the orchestrator.
//! Pipeline history lives in memory only; see [`ledger`].

pub mod ledger;

// Re-export for convenience
pub use ledger::{InMemoryLedger, JobLedger, LedgerError};
