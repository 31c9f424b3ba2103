//! Job polling endpoints

use std::time::Duration;

use presto_core::domain::job::JobCode;
use presto_core::dto::job::JobStatus;
use reqwest::{Method, StatusCode};

use crate::PrestoClient;
use crate::error::{ClientError, Result};
use crate::reports::Download;

impl PrestoClient {
    // =============================================================================
    // Job Polling
    // =============================================================================

    /// Get the status of a job
    ///
    /// # Returns
    /// The job status, or [`ClientError::NotFound`] if the server does not
    /// know the code (never issued, answered synchronously, or evicted)
    pub async fn job_status(&self, code: JobCode) -> Result<JobStatus> {
        let response = self
            .request(Method::GET, &format!("/job/{}", code))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(format!("Job {}", code)));
        }

        self.handle_response(response).await
    }

    /// Poll a job until it reaches a terminal state
    ///
    /// # Arguments
    /// * `code` - The job code returned with a pending render
    /// * `interval` - Delay between polls
    ///
    /// # Returns
    /// The terminal status, which may describe a failure
    pub async fn wait_for_job(&self, code: JobCode, interval: Duration) -> Result<JobStatus> {
        loop {
            let status = self.job_status(code).await?;
            if status.is_terminal() {
                return Ok(status);
            }

            tracing::debug!("Job {} still {}, polling again", code, status.phase);
            tokio::time::sleep(interval).await;
        }
    }

    /// Download the artifact of a completed job
    pub async fn download_artifact(&self, code: JobCode) -> Result<Download> {
        let response = self
            .request(Method::GET, &format!("/job/{}/artifact", code))
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Download::from_response(response).await,
            StatusCode::NOT_FOUND => Err(ClientError::NotFound(format!("Artifact of job {}", code))),
            _ => Err(Self::error_from(response).await),
        }
    }

    /// List every job still pollable on the server
    pub async fn list_jobs(&self) -> Result<Vec<JobStatus>> {
        let response = self.request(Method::GET, "/jobs").send().await?;

        self.handle_response(response).await
    }
}
