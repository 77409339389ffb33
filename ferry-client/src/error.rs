//! Error types for the remote task client

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when talking to the remote task API
///
/// Every variant except [`ClientError::Transport`] carries the raw response
/// text and status code, so a rejected job and a malformed success stay
/// distinguishable for callers.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced a response
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The remote answered with a non-success status
    #[error("remote rejected the request (status {status}): {raw}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Response body, verbatim
        raw: String,
    },

    /// The remote answered with a success status but the body was not usable
    #[error("failed to decode remote response (status {status}): {raw}")]
    Decode {
        /// HTTP status code
        status: u16,
        /// Response body, verbatim
        raw: String,
    },

    /// A submission succeeded but the response held no task identifier
    #[error("submission response has no task id (status {status})")]
    MissingTaskId {
        /// HTTP status code
        status: u16,
        /// Response body, verbatim
        raw: String,
    },
}

impl ClientError {
    /// Create a rejection error from status code and body
    pub fn rejected(status: u16, raw: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            raw: raw.into(),
        }
    }

    /// Create a decode error from status code and body
    pub fn decode(status: u16, raw: impl Into<String>) -> Self {
        Self::Decode {
            status,
            raw: raw.into(),
        }
    }

    /// Raw response text, when a response was received
    pub fn raw_content(&self) -> Option<&str> {
        match self {
            Self::Transport(_) => None,
            Self::Rejected { raw, .. } | Self::Decode { raw, .. } | Self::MissingTaskId { raw, .. } => {
                Some(raw)
            }
        }
    }

    /// HTTP status code, when a response was received
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Transport(err) => err.status().map(|s| s.as_u16()),
            Self::Rejected { status, .. }
            | Self::Decode { status, .. }
            | Self::MissingTaskId { status, .. } => Some(*status),
        }
    }

    /// Check if the remote was never reached
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Check if this error is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Rejected { status: 404, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_exposes_raw_content() {
        let err = ClientError::rejected(400, "{\"message\":\"bad app\"}");
        assert_eq!(err.status_code(), Some(400));
        assert_eq!(err.raw_content(), Some("{\"message\":\"bad app\"}"));
        assert!(!err.is_transport());
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_not_found() {
        assert!(ClientError::rejected(404, "").is_not_found());
        assert!(!ClientError::decode(200, "<html>").is_not_found());
    }
}
