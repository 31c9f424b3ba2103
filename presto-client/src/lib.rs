//! Presto HTTP Client
//!
//! A type-safe HTTP client for the Presto report server, implementing the
//! client side of the polling protocol.
//!
//! # Example
//!
//! ```no_run
//! use presto_client::{FetchOutcome, PrestoClient};
//! use presto_core::domain::report::ReportParams;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = PrestoClient::new("http://localhost:8080").with_user("alice");
//!
//!     let mut params = ReportParams::new();
//!     params.insert("id".to_string(), "42".to_string());
//!
//!     let download = match client.fetch_report("invoice", &params).await? {
//!         FetchOutcome::Ready(download) => download,
//!         FetchOutcome::Pending(pending) => {
//!             client.wait_for_job(pending.job_code, Duration::from_secs(2)).await?;
//!             client.download_artifact(pending.job_code).await?
//!         }
//!         FetchOutcome::DuplicateInFlight => anyhow::bail!("already rendering"),
//!     };
//!
//!     println!("Got {} bytes", download.bytes.len());
//!     Ok(())
//! }
//! ```

pub mod error;
mod jobs;
mod reports;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use reports::{Download, FetchOutcome};

use presto_core::dto::report::ErrorResponse;
use reqwest::{Client, Method, RequestBuilder, redirect};
use serde::de::DeserializeOwned;

const USER_HEADER: &str = "x-presto-user";
const SESSION_HEADER: &str = "x-presto-session";
const DELIVER_TO_HEADER: &str = "x-presto-deliver-to";

/// HTTP client for the Presto report server
///
/// Requester identity is sent with every request:
/// - `with_user` sets the requesting user
/// - `with_session` sets the dedup scope (defaults to the user on the server)
/// - `with_delivery_target` asks for direct delivery of completed renders
#[derive(Debug, Clone)]
pub struct PrestoClient {
    /// Base URL of the server (e.g., "http://localhost:8080")
    base_url: String,
    /// HTTP client instance
    client: Client,
    user: Option<String>,
    session: Option<String>,
    delivery_target: Option<String>,
}

impl PrestoClient {
    /// Create a new client
    ///
    /// The underlying HTTP client does not follow redirects: a redirect is
    /// how the server says a render is still pending.
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .build()
            .unwrap_or_else(|_| Client::new());
        Self::with_client(base_url, client)
    }

    /// Create a new client with a custom HTTP client
    ///
    /// The client must be configured with `redirect::Policy::none()`,
    /// otherwise pending renders are followed instead of reported.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            user: None,
            session: None,
            delivery_target: None,
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_session(mut self, session: impl Into<String>) -> Self {
        self.session = Some(session.into());
        self
    }

    pub fn with_delivery_target(mut self, target: impl Into<String>) -> Self {
        self.delivery_target = Some(target.into());
        self
    }

    /// Get the base URL of the server
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Starts a request carrying the requester headers
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self.client.request(method, self.url(path));
        if let Some(user) = &self.user {
            builder = builder.header(USER_HEADER, user);
        }
        if let Some(session) = &self.session {
            builder = builder.header(SESSION_HEADER, session);
        }
        if let Some(target) = &self.delivery_target {
            builder = builder.header(DELIVER_TO_HEADER, target);
        }
        builder
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    ///
    /// This method checks the status code and returns an appropriate error if
    /// the request failed, or deserializes the response body if successful.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            return Err(Self::error_from(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Turns an error response into a [`ClientError`]
    async fn error_from(response: reqwest::Response) -> ClientError {
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        ClientError::api_error(status, error_message(&text))
    }
}

/// Extracts the message of a `{"error": ...}` body, or returns the raw text
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.error)
        .unwrap_or_else(|_| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = PrestoClient::new("http://localhost:8080");
        assert_eq!(client.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = PrestoClient::new("http://localhost:8080/");
        assert_eq!(client.base_url(), "http://localhost:8080");
        assert_eq!(client.url("/jobs"), "http://localhost:8080/jobs");
    }

    #[test]
    fn test_requester_headers() {
        let client = PrestoClient::new("http://localhost:8080")
            .with_user("alice")
            .with_session("tab-1")
            .with_delivery_target("printer-7");

        let request = client.request(Method::GET, "/jobs").build().unwrap();
        let headers = request.headers();
        assert_eq!(headers[USER_HEADER], "alice");
        assert_eq!(headers[SESSION_HEADER], "tab-1");
        assert_eq!(headers[DELIVER_TO_HEADER], "printer-7");
    }

    #[test]
    fn test_anonymous_request_has_no_identity_headers() {
        let client = PrestoClient::new("http://localhost:8080");
        let request = client.request(Method::GET, "/jobs").build().unwrap();
        assert!(request.headers().get(USER_HEADER).is_none());
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(error_message(r#"{"error":"Job x not found"}"#), "Job x not found");
        assert_eq!(error_message("plain failure"), "plain failure");
    }
}
