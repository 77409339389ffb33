//! Task passthrough DTOs

use serde::{Deserialize, Serialize};

/// Request to submit the source manifest task on its own
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTask {
    /// Falls back to the configured default bucket
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default)]
    pub alternate_dataset: bool,
}
