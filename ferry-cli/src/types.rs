//! Common types used across CLI modules

use ferry_core::domain::pipeline::{RUN_KEY_SUFFIX, run_key};

/// A run named either by its key or by the bucket it transfers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunTarget {
    /// Full run key (e.g., "acme-data_transfer_pipeline")
    Key(String),
    /// Bucket name, from which the run key is derived
    Bucket(String),
}

impl RunTarget {
    /// Parse a string into a RunTarget
    ///
    /// Anything carrying the run key suffix is taken as a key, the rest as a bucket
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if input.ends_with(RUN_KEY_SUFFIX) && input.len() > RUN_KEY_SUFFIX.len() {
            RunTarget::Key(input.to_string())
        } else {
            RunTarget::Bucket(input.to_string())
        }
    }

    /// The run key this target resolves to
    pub fn run_key(&self) -> String {
        match self {
            RunTarget::Key(key) => key.clone(),
            RunTarget::Bucket(bucket) => run_key(bucket),
        }
    }
}

impl std::fmt::Display for RunTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunTarget::Key(key) => write!(f, "{}", key),
            RunTarget::Bucket(bucket) => write!(f, "{}", bucket),
        }
    }
}

impl From<&str> for RunTarget {
    fn from(s: &str) -> Self {
        RunTarget::parse(s)
    }
}
