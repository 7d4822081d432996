//! Error types for the trigger service.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use uuid::Uuid;

/// Application-level errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Job {0} not found")]
    JobNotFound(Uuid),

    #[error("Backup job {0} is already running")]
    JobAlreadyRunning(Uuid),

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Service is shutting down")]
    ShuttingDown,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorBody {
            error: String,
            code: &'static str,
            #[serde(skip_serializing_if = "Option::is_none")]
            job_id: Option<Uuid>,
        }

        let (status, code, job_id) = match &self {
            ApiError::JobNotFound(id) => (StatusCode::NOT_FOUND, "JOB_NOT_FOUND", Some(*id)),
            ApiError::JobAlreadyRunning(id) => {
                (StatusCode::CONFLICT, "JOB_ALREADY_RUNNING", Some(*id))
            }
            ApiError::InvalidBody(_) => (StatusCode::BAD_REQUEST, "INVALID_BODY", None),
            ApiError::ShuttingDown => (StatusCode::SERVICE_UNAVAILABLE, "SHUTTING_DOWN", None),
        };

        let body = ErrorBody {
            error: self.to_string(),
            code,
            job_id,
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
