//! Error body returned by the service surface

use serde::{Deserialize, Serialize};

/// Structured error response
///
/// `raw_content` and `status_code` are filled when the failure came from the
/// remote task API, so callers can tell a rejected job from a malformed reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            raw_content: None,
            status_code: None,
        }
    }
}
