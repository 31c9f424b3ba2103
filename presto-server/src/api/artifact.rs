//! Artifact responses

use axum::{
    body::Body,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use presto_core::domain::job::{Artifact, JobDescriptor};

use crate::api::error::{ApiError, ApiResult};

/// Serves the artifact of a completed job as a download
pub async fn artifact_response(descriptor: &JobDescriptor) -> ApiResult<Response> {
    let artifact = descriptor.artifact().ok_or_else(|| {
        ApiError::Conflict(format!("Job {} has no artifact", descriptor.job_code))
    })?;

    let bytes = match tokio::fs::read(&artifact.path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::NotFound(format!(
                "Artifact of job {} is no longer available",
                descriptor.job_code
            )));
        }
        Err(e) => {
            return Err(ApiError::InternalError(format!(
                "Failed to read artifact of job {}: {}",
                descriptor.job_code, e
            )));
        }
    };

    tracing::debug!(
        "Serving artifact of job {} ({} bytes)",
        descriptor.job_code,
        bytes.len()
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type(artifact)),
            (header::CONTENT_DISPOSITION, content_disposition(artifact)),
        ],
        Body::from(bytes),
    )
        .into_response())
}

fn content_type(artifact: &Artifact) -> HeaderValue {
    HeaderValue::from_str(&artifact.mime_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"))
}

fn content_disposition(artifact: &Artifact) -> HeaderValue {
    let name: String = artifact
        .suggested_file_name
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .filter(|c| !matches!(c, '"' | '\\'))
        .collect();
    HeaderValue::from_str(&format!("attachment; filename=\"{}\"", name))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}
