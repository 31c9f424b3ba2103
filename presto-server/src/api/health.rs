//! Health Check API Handler
//!
//! Liveness probe for load balancers and monitoring.

use axum::{http::StatusCode, response::IntoResponse};

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
