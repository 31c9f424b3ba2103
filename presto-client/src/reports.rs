//! Report endpoints

use presto_core::domain::report::ReportParams;
use presto_core::dto::job::PendingJob;
use presto_core::dto::report::SubmitReport;
use reqwest::{Method, StatusCode, header};

use crate::PrestoClient;
use crate::error::{ClientError, Result};

/// A rendered artifact as served by the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub bytes: Vec<u8>,
    pub mime_type: Option<String>,
    pub file_name: Option<String>,
}

impl Download {
    pub(crate) async fn from_response(response: reqwest::Response) -> Result<Self> {
        let header_str = |name| {
            response
                .headers()
                .get(name)
                .and_then(|v: &header::HeaderValue| v.to_str().ok())
                .map(str::to_string)
        };
        let mime_type = header_str(header::CONTENT_TYPE);
        let file_name = header_str(header::CONTENT_DISPOSITION)
            .as_deref()
            .and_then(disposition_file_name);

        let bytes = response.bytes().await?.to_vec();
        Ok(Self {
            bytes,
            mime_type,
            file_name,
        })
    }
}

/// What the server answered to a render request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The render finished within the wait window
    Ready(Download),

    /// The render continues; poll the job
    Pending(PendingJob),

    /// An identical request from the same requester is still rendering
    DuplicateInFlight,
}

impl PrestoClient {
    // =============================================================================
    // Report Dispatch
    // =============================================================================

    /// Request a report by print code
    ///
    /// # Arguments
    /// * `print_code` - Catalog name of the report
    /// * `params` - Report parameters, sent as query parameters
    pub async fn fetch_report(&self, print_code: &str, params: &ReportParams) -> Result<FetchOutcome> {
        let response = self
            .request(Method::GET, &report_path(print_code))
            .query(params)
            .send()
            .await?;

        self.handle_fetch(response).await
    }

    /// Request a report by explicit target
    pub async fn submit_report(&self, req: &SubmitReport) -> Result<FetchOutcome> {
        let response = self
            .request(Method::POST, "/report")
            .json(req)
            .send()
            .await?;

        self.handle_fetch(response).await
    }

    async fn handle_fetch(&self, response: reqwest::Response) -> Result<FetchOutcome> {
        match response.status() {
            StatusCode::OK => Ok(FetchOutcome::Ready(Download::from_response(response).await?)),
            StatusCode::SEE_OTHER => {
                let pending: PendingJob = response.json().await.map_err(|e| {
                    ClientError::ParseError(format!("Failed to parse pending job: {}", e))
                })?;
                tracing::debug!("Render pending as job {}", pending.job_code);
                Ok(FetchOutcome::Pending(pending))
            }
            StatusCode::CONFLICT => Ok(FetchOutcome::DuplicateInFlight),
            _ => Err(Self::error_from(response).await),
        }
    }
}

/// Extracts `filename` from a `Content-Disposition` value
/// Path of a print code, encoded as a single segment
fn report_path(print_code: &str) -> String {
    format!("/report/{}", urlencoding::encode(print_code))
}

fn disposition_file_name(value: &str) -> Option<String> {
    value
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))
        .map(|name| name.trim_matches('"').to_string())
        .filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_path_encodes_print_code() {
        assert_eq!(report_path("invoice"), "/report/invoice");
        assert_eq!(report_path("sales/q3"), "/report/sales%2Fq3");
        assert_eq!(report_path("a?b#c"), "/report/a%3Fb%23c");
        assert_eq!(report_path("year end"), "/report/year%20end");
    }

    #[test]
    fn test_disposition_file_name() {
        assert_eq!(
            disposition_file_name("attachment; filename=\"invoice.txt\""),
            Some("invoice.txt".to_string())
        );
        assert_eq!(
            disposition_file_name("attachment;filename=report.csv"),
            Some("report.csv".to_string())
        );
        assert_eq!(disposition_file_name("attachment"), None);
        assert_eq!(disposition_file_name("attachment; filename=\"\""), None);
    }
}
