//! Report API Handlers
//!
//! Entry points that start renders. Each answers with the artifact itself
//! when the render finishes within the wait window, or redirects to the
//! job's wait resource otherwise.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use presto_core::domain::job::JobCode;
use presto_core::domain::report::ReportParams;
use presto_core::dto::job::PendingJob;
use presto_core::dto::report::SubmitReport;
use presto_jobs::Outcome;

use crate::api::AppState;
use crate::api::artifact::artifact_response;
use crate::api::error::{ApiError, ApiResult};
use crate::api::requester::Requester;

// =============================================================================
// Dispatch Endpoints
// =============================================================================

/// GET /report/{print_code}
/// Render a report by print code; query parameters are report parameters
pub async fn fetch_report(
    State(state): State<AppState>,
    Requester(context): Requester,
    Path(print_code): Path<String>,
    Query(params): Query<ReportParams>,
) -> ApiResult<Response> {
    tracing::info!(
        "Report '{}' requested by {} ({} parameter(s))",
        print_code,
        context.user_id,
        params.len()
    );

    let outcome = state
        .dispatcher
        .dispatch_print_code(context, &print_code, params)
        .await?;

    outcome_response(outcome).await
}

/// POST /report
/// Render an explicitly identified report
pub async fn submit_report(
    State(state): State<AppState>,
    Requester(context): Requester,
    Json(req): Json<SubmitReport>,
) -> ApiResult<Response> {
    if req.target.plugin_ref.is_empty() || req.target.report_ref.is_empty() {
        return Err(ApiError::BadRequest(
            "plugin_ref and report_ref are required".to_string(),
        ));
    }

    tracing::info!(
        "Report {}/{} submitted by {}",
        req.target.plugin_ref,
        req.target.report_ref,
        context.user_id
    );

    let outcome = state
        .dispatcher
        .dispatch_report(context, req.target, req.params)
        .await;

    outcome_response(outcome).await
}

// =============================================================================
// Helpers
// =============================================================================

/// Path of the "please wait" resource for a job
pub fn wait_url(code: JobCode) -> String {
    format!("/job/{}/wait", code)
}

async fn outcome_response(outcome: Outcome) -> ApiResult<Response> {
    match outcome {
        Outcome::Ready(descriptor) => artifact_response(&descriptor).await,
        Outcome::Pending(code) => {
            let poll_url = wait_url(code);
            Ok((
                StatusCode::SEE_OTHER,
                [(header::LOCATION, poll_url.clone())],
                Json(PendingJob {
                    job_code: code,
                    poll_url,
                }),
            )
                .into_response())
        }
        Outcome::DuplicateInFlight => Err(ApiError::Conflict(
            "An identical request is already being rendered".to_string(),
        )),
        Outcome::Failed(failure) => Err(ApiError::JobFailed(failure)),
    }
}
