//! API Module
//!
//! HTTP API layer for the report server.
//! Each submodule handles endpoints for a specific domain.

pub mod artifact;
pub mod error;
pub mod health;
pub mod job;
pub mod report;
pub mod requester;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use presto_jobs::{Dispatcher, PollingService};
use tower_http::trace::TraceLayer;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub polling: PollingService,
}

impl AppState {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        let polling = PollingService::new(dispatcher.jobs().clone());
        Self {
            dispatcher,
            polling,
        }
    }
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Report endpoints
        .route("/report", post(report::submit_report))
        .route("/report/{print_code}", get(report::fetch_report))
        // Job endpoints
        .route("/jobs", get(job::list_jobs))
        .route("/job/{code}", get(job::get_job))
        .route("/job/{code}/wait", get(job::wait_job))
        .route("/job/{code}/artifact", get(job::get_artifact))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use presto_core::domain::report::{ReportInfo, ReportTarget};
    use presto_core::dto::job::{JobPhase, JobStatus, PendingJob};
    use presto_jobs::service::{CatalogEntry, CatalogResolver, TextRenderer};
    use presto_jobs::{Config, DedupCache, JobCache};
    use std::time::Duration;
    use tempfile::TempDir;
    use tower::ServiceExt;

    struct TestApp {
        router: Router,
        _output: TempDir,
    }

    fn target(format: &str) -> ReportTarget {
        ReportTarget {
            plugin_ref: "billing".to_string(),
            report_ref: "invoice".to_string(),
            info: ReportInfo {
                title: "Invoice".to_string(),
                format: format.to_string(),
            },
        }
    }

    fn app(render_delay: Duration) -> TestApp {
        let output = tempfile::tempdir().unwrap();
        let config = Config {
            wait_window: Duration::from_millis(200),
            ..Config::default()
        };
        let catalog = CatalogResolver::empty().with_entry(
            "invoice",
            CatalogEntry {
                target: target("text"),
                defaults: Default::default(),
                required: vec!["id".to_string()],
            },
        );
        let renderer = TextRenderer::new(output.path()).with_delay(render_delay);
        let dispatcher = Dispatcher::new(
            config.clone(),
            Arc::new(JobCache::new()),
            Arc::new(DedupCache::new(config.artifact_freshness)),
            Arc::new(renderer),
        )
        .with_resolver(Arc::new(catalog));

        TestApp {
            router: create_router(AppState::new(Arc::new(dispatcher))),
            _output: output,
        }
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("x-presto-user", "alice")
            .body(Body::empty())
            .unwrap()
    }

    fn submit(format: &str) -> Request<Body> {
        let body = serde_json::json!({
            "target": target(format),
            "params": { "id": "7" }
        });
        Request::builder()
            .method("POST")
            .uri("/report")
            .header("x-presto-user", "alice")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = app(Duration::ZERO);
        let response = app.router.oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_fast_report_is_served_directly() {
        let app = app(Duration::ZERO);

        let response = app.router.oneshot(get("/report/invoice?id=7")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"invoice.txt\""
        );
        let body = body_text(response).await;
        assert!(body.contains("requested by: alice"));
        assert!(body.contains("id = 7"));
    }

    #[tokio::test]
    async fn test_unknown_print_code_is_bad_request() {
        let app = app(Duration::ZERO);

        let response = app.router.oneshot(get("/report/payroll")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("Unknown print code"));
    }

    #[tokio::test]
    async fn test_missing_parameter_is_bad_request() {
        let app = app(Duration::ZERO);
        let response = app.router.oneshot(get("/report/invoice")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_failed_render_is_server_error() {
        let app = app(Duration::ZERO);

        let response = app.router.oneshot(submit("pdf")).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("Unsupported report format"));
    }

    #[tokio::test]
    async fn test_slow_report_redirects_to_wait_resource() {
        let app = app(Duration::from_secs(30));

        let response = app.router.clone().oneshot(submit("text")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response.headers()[header::LOCATION].to_str().unwrap().to_string();
        let pending: PendingJob = body_json(response).await;
        assert_eq!(location, format!("/job/{}/wait", pending.job_code));
        assert_eq!(pending.poll_url, location);

        // Resubmitting while the render is in flight is a conflict.
        let duplicate = app.router.clone().oneshot(submit("text")).await.unwrap();
        assert_eq!(duplicate.status(), StatusCode::CONFLICT);

        let wait = app.router.clone().oneshot(get(&location)).await.unwrap();
        assert_eq!(wait.status(), StatusCode::ACCEPTED);
        assert_eq!(wait.headers()[header::RETRY_AFTER], "2");

        let status = app
            .router
            .clone()
            .oneshot(get(&format!("/job/{}", pending.job_code)))
            .await
            .unwrap();
        assert_eq!(status.status(), StatusCode::OK);
        let status: JobStatus = body_json(status).await;
        assert_eq!(status.phase, JobPhase::Running);
        assert_eq!(status.requesting_user, "alice");

        let artifact = app
            .router
            .clone()
            .oneshot(get(&format!("/job/{}/artifact", pending.job_code)))
            .await
            .unwrap();
        assert_eq!(artifact.status(), StatusCode::CONFLICT);

        let list = app.router.oneshot(get("/jobs")).await.unwrap();
        let jobs: Vec<JobStatus> = body_json(list).await;
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].job_code, pending.job_code);
    }

    #[tokio::test]
    async fn test_completed_job_wait_redirects_to_artifact() {
        let app = app(Duration::from_millis(400));

        let response = app.router.clone().oneshot(submit("csv")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let pending: PendingJob = body_json(response).await;

        tokio::time::sleep(Duration::from_millis(600)).await;

        let wait = app.router.clone().oneshot(get(&pending.poll_url)).await.unwrap();
        assert_eq!(wait.status(), StatusCode::SEE_OTHER);
        let artifact_url = format!("/job/{}/artifact", pending.job_code);
        assert_eq!(wait.headers()[header::LOCATION], artifact_url.as_str());

        let artifact = app.router.oneshot(get(&artifact_url)).await.unwrap();
        assert_eq!(artifact.status(), StatusCode::OK);
        assert_eq!(artifact.headers()[header::CONTENT_TYPE], "text/csv");
        assert_eq!(body_text(artifact).await, "parameter,value\nid,7\n");
    }

    #[tokio::test]
    async fn test_unknown_job_is_not_found() {
        let app = app(Duration::ZERO);
        let code = presto_core::domain::job::JobCode::generate();

        for uri in [
            format!("/job/{}", code),
            format!("/job/{}/wait", code),
            format!("/job/{}/artifact", code),
        ] {
            let response = app.router.clone().oneshot(get(&uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_sessions_scope_deduplication() {
        let app = app(Duration::from_secs(30));

        let first = app.router.clone().oneshot(submit("text")).await.unwrap();
        assert_eq!(first.status(), StatusCode::SEE_OTHER);

        let mut other = submit("text");
        other
            .headers_mut()
            .insert("x-presto-session", "another-tab".parse().unwrap());
        let second = app.router.oneshot(other).await.unwrap();
        assert_eq!(second.status(), StatusCode::SEE_OTHER);
    }
}
