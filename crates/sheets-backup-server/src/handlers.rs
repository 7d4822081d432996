//! HTTP handlers for the trigger service.
//!
//! Implements:
//! - POST / and POST /backup - Start a backup job (202, fire-and-forget)
//! - GET /jobs/{id} - Job status and, once finished, its RunReport
//! - DELETE /jobs/{id} - Request cancellation
//! - GET /health - Health check endpoint

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::jobs::{JobRegistry, JobSnapshot};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<JobRegistry>,
}

/// Build the router. Methods other than the ones listed get 405.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", post(trigger_handler))
        .route("/backup", post(trigger_handler))
        .route("/jobs/{id}", get(job_status_handler).delete(cancel_job_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: &'static str,
    pub running_job: Option<Uuid>,
}

/// GET /health - Health check endpoint.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION"),
        running_job: state.registry.running_job(),
    })
}

/// Optional trigger body.
#[derive(Debug, Default, Deserialize)]
pub struct TriggerRequest {
    /// Overrides the configured root folder for this run
    pub root_folder_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    pub job_id: Uuid,
    pub root_folder_id: String,
}

/// POST / and POST /backup - Start a backup and return immediately.
///
/// The body is optional: an empty body backs up the configured root.
pub async fn trigger_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<TriggerResponse>)> {
    let request = parse_trigger_body(&body)?;
    let root_folder_id = request
        .root_folder_id
        .unwrap_or_else(|| state.registry.default_root_folder_id().to_string());

    let job_id = state.registry.start(root_folder_id.clone())?;
    debug!(%job_id, "Trigger accepted");

    Ok((
        StatusCode::ACCEPTED,
        Json(TriggerResponse {
            job_id,
            root_folder_id,
        }),
    ))
}

fn parse_trigger_body(body: &[u8]) -> Result<TriggerRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(TriggerRequest::default());
    }

    let request: TriggerRequest =
        serde_json::from_slice(body).map_err(|e| ApiError::InvalidBody(e.to_string()))?;

    if let Some(root) = &request.root_folder_id {
        if root.trim().is_empty() {
            return Err(ApiError::InvalidBody(
                "root_folder_id must not be empty".to_string(),
            ));
        }
    }
    Ok(request)
}

/// GET /jobs/{id}
pub async fn job_status_handler(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobSnapshot>> {
    state
        .registry
        .get(job_id)
        .map(Json)
        .ok_or(ApiError::JobNotFound(job_id))
}

/// DELETE /jobs/{id} - Cancellation is asynchronous; poll the status.
pub async fn cancel_job_handler(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<(StatusCode, Json<JobSnapshot>)> {
    let snapshot = state.registry.cancel(job_id)?;
    Ok((StatusCode::ACCEPTED, Json(snapshot)))
}
