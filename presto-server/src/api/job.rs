//! Job API Handlers
//!
//! Polling endpoints for jobs that outlived their wait window.

use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};
use presto_core::domain::job::{JobCode, JobDescriptor, JobState};
use presto_core::dto::job::JobStatus;
use std::sync::Arc;

use crate::api::AppState;
use crate::api::artifact::artifact_response;
use crate::api::error::{ApiError, ApiResult};

/// Seconds a client is asked to wait between polls
pub const RETRY_AFTER_SECS: u64 = 2;

// =============================================================================
// Status Endpoints
// =============================================================================

/// GET /job/{code}
pub async fn get_job(
    State(state): State<AppState>,
    Path(code): Path<JobCode>,
) -> ApiResult<Json<JobStatus>> {
    tracing::debug!("Getting job: {}", code);

    let descriptor = refresh(&state, code)?;
    Ok(Json(JobStatus::from(descriptor.as_ref())))
}

/// GET /jobs
/// List every job still pollable
pub async fn list_jobs(State(state): State<AppState>) -> Json<Vec<JobStatus>> {
    tracing::debug!("Listing jobs");

    let jobs = state
        .polling
        .list()
        .iter()
        .map(|d| JobStatus::from(d.as_ref()))
        .collect();

    Json(jobs)
}

/// GET /job/{code}/wait
/// "Please wait" resource: tells the client to come back or where to go next
pub async fn wait_job(
    State(state): State<AppState>,
    Path(code): Path<JobCode>,
) -> ApiResult<Response> {
    let descriptor = refresh(&state, code)?;

    match &descriptor.state {
        JobState::Running => Ok((
            StatusCode::ACCEPTED,
            [(header::RETRY_AFTER, RETRY_AFTER_SECS.to_string())],
            Json(JobStatus::from(descriptor.as_ref())),
        )
            .into_response()),
        JobState::Completed { .. } => {
            Ok(Redirect::to(&format!("/job/{}/artifact", code)).into_response())
        }
        JobState::Failed { error } => Err(ApiError::JobFailed(error.clone())),
    }
}

/// GET /job/{code}/artifact
pub async fn get_artifact(
    State(state): State<AppState>,
    Path(code): Path<JobCode>,
) -> ApiResult<Response> {
    let descriptor = refresh(&state, code)?;

    match &descriptor.state {
        JobState::Running => Err(ApiError::Conflict(format!(
            "Job {} is still running",
            code
        ))),
        JobState::Completed { .. } => artifact_response(&descriptor).await,
        JobState::Failed { error } => Err(ApiError::JobFailed(error.clone())),
    }
}

fn refresh(state: &AppState, code: JobCode) -> ApiResult<Arc<JobDescriptor>> {
    state
        .polling
        .refresh(code)
        .ok_or_else(|| ApiError::NotFound(format!("Job {} not found", code)))
}
