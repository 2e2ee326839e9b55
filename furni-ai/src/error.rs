//! Error types for furni-ai
//!
//! `AnalysisError` is what the orchestrator and normalizer return;
//! `ApiError` is the HTTP boundary representation of every failure.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::status_poller::PollError;

/// Failures of the upload / analyze / normalize pipeline
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Bad input: empty title, non-image payload
    #[error("Validation error: {0}")]
    Validation(String),

    /// Blob storage write failed
    #[error("Upload failed: {0}")]
    Upload(String),

    /// Insert/update/select failed on any table
    #[error("Database error: {0}")]
    Database(String),

    /// AI collaborator answered with a non-2xx status
    #[error("Analysis service error {status}: {body}")]
    Service { status: u16, body: String },

    /// AI collaborator could not be reached
    #[error("Analysis service unreachable: {0}")]
    Transport(String),

    /// AI response is not valid JSON or misses required fields
    #[error("Failed to parse analysis response: {0}")]
    Parse(String),

    /// Background analysis was stopped before it finished
    #[error("Analysis cancelled")]
    Cancelled,
}

impl AnalysisError {
    /// Stable machine-readable code, also used in failure events
    pub fn code(&self) -> &'static str {
        match self {
            AnalysisError::Validation(_) => "VALIDATION_ERROR",
            AnalysisError::Upload(_) => "UPLOAD_ERROR",
            AnalysisError::Database(_) => "DATABASE_ERROR",
            AnalysisError::Service { .. } => "ANALYSIS_SERVICE_ERROR",
            AnalysisError::Transport(_) => "ANALYSIS_SERVICE_UNREACHABLE",
            AnalysisError::Parse(_) => "ANALYSIS_PARSE_ERROR",
            AnalysisError::Cancelled => "ANALYSIS_CANCELLED",
        }
    }
}

impl From<furni_common::Error> for AnalysisError {
    fn from(err: furni_common::Error) -> Self {
        match err {
            furni_common::Error::InvalidInput(msg) => AnalysisError::Validation(msg),
            other => AnalysisError::Database(other.to_string()),
        }
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Upstream analysis service failed (502)
    #[error("Upstream error {status}: {body}")]
    Upstream { status: u16, body: String },

    /// Required collaborator not configured (503)
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Waiting for a result took too long (504)
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("Common error: {0}")]
    Common(#[from] furni_common::Error),
}

impl From<PollError> for ApiError {
    fn from(err: PollError) -> Self {
        match err {
            PollError::DesignNotFound(id) => ApiError::NotFound(format!("Design not found: {}", id)),
            PollError::TimedOut { .. } => ApiError::Timeout(err.to_string()),
            PollError::AnalysisFailed(_) | PollError::Cancelled => ApiError::Internal(err.to_string()),
            PollError::Store(inner) => ApiError::Common(inner),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Upstream { status, body } => (
                StatusCode::BAD_GATEWAY,
                "UPSTREAM_ERROR",
                format!("upstream returned {}: {}", status, body),
            ),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE", msg),
            ApiError::Timeout(msg) => (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Analysis(ref err) => {
                let status = match err {
                    AnalysisError::Validation(_) => StatusCode::BAD_REQUEST,
                    AnalysisError::Service { .. }
                    | AnalysisError::Transport(_)
                    | AnalysisError::Parse(_) => StatusCode::BAD_GATEWAY,
                    AnalysisError::Upload(_)
                    | AnalysisError::Database(_)
                    | AnalysisError::Cancelled => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (status, err.code(), err.to_string())
            }
            ApiError::Common(ref err) => {
                let status = match err {
                    furni_common::Error::NotFound(_) => StatusCode::NOT_FOUND,
                    furni_common::Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, "COMMON_ERROR", err.to_string())
            }
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
