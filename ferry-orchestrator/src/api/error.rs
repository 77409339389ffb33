//! API Error Handling
//!
//! Unified error type and conversion for API responses. Failures that came
//! from the remote task API keep its raw body and status code.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use ferry_client::ClientError;
use ferry_core::dto::error::ErrorBody;

use crate::service::PipelineError;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    /// The remote task API failed or rejected the call
    Upstream {
        status: StatusCode,
        message: String,
        raw_content: Option<String>,
        status_code: Option<u16>,
    },
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorBody::new(msg)),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorBody::new(msg)),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, ErrorBody::new(msg)),
            ApiError::Upstream {
                status,
                message,
                raw_content,
                status_code,
            } => {
                tracing::warn!("Upstream error: {}", message);
                (
                    status,
                    ErrorBody {
                        error: message,
                        raw_content,
                        status_code,
                    },
                )
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorBody::new(msg))
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<ClientError> for ApiError {
    fn from(err: ClientError) -> Self {
        let status = match &err {
            ClientError::Rejected { status: 404, .. } => StatusCode::NOT_FOUND,
            ClientError::Transport(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::BAD_GATEWAY,
        };

        ApiError::Upstream {
            status,
            message: err.to_string(),
            raw_content: err.raw_content().map(str::to_string),
            status_code: err.status_code(),
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        let status = match &err {
            PipelineError::AlreadyRunning(_) => return ApiError::Conflict(err.to_string()),
            PipelineError::Aborted(_) => return ApiError::InternalError(err.to_string()),
            PipelineError::Cancelled { .. } => StatusCode::CONFLICT,
            PipelineError::PollTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::BAD_GATEWAY,
        };

        ApiError::Upstream {
            status,
            message: err.to_string(),
            raw_content: err.raw_content().map(str::to_string),
            status_code: err.status_code(),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
