//! Configuration module
//!
//! Handles CLI configuration including the service URL.

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the orchestrator service
    pub service_url: String,
}
