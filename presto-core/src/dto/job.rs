//! Job DTOs for the polling protocol

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::job::{FailureKind, JobCode, JobDescriptor, JobState};

/// Coarse phase of a job as seen by a polling client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    Running,
    Completed,
    Failed,
}

impl std::fmt::Display for JobPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobPhase::Running => write!(f, "Running"),
            JobPhase::Completed => write!(f, "Completed"),
            JobPhase::Failed => write!(f, "Failed"),
        }
    }
}

/// Status of a job returned by `GET /job/{code}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
    pub job_code: JobCode,
    pub phase: JobPhase,
    pub percent_completed: u8,
    pub requesting_user: String,
    pub plugin_ref: String,
    pub report_ref: String,
    pub started_at: DateTime<Utc>,
    pub mime_type: Option<String>,
    pub suggested_file_name: Option<String>,
    pub error: Option<String>,
    pub error_kind: Option<FailureKind>,
    pub direct_delivery_target: Option<String>,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        self.phase != JobPhase::Running
    }
}

impl From<&JobDescriptor> for JobStatus {
    fn from(descriptor: &JobDescriptor) -> Self {
        let (phase, artifact, error) = match &descriptor.state {
            JobState::Running => (JobPhase::Running, None, None),
            JobState::Completed { artifact } => (JobPhase::Completed, Some(artifact), None),
            JobState::Failed { error } => (JobPhase::Failed, None, Some(error)),
        };

        JobStatus {
            job_code: descriptor.job_code,
            phase,
            percent_completed: descriptor.percent_completed(),
            requesting_user: descriptor.requesting_user.clone(),
            plugin_ref: descriptor.origin.plugin_ref.clone(),
            report_ref: descriptor.origin.report_ref.clone(),
            started_at: descriptor.started_at,
            mime_type: artifact.map(|a| a.mime_type.clone()),
            suggested_file_name: artifact.map(|a| a.suggested_file_name.clone()),
            error: error.map(|e| e.message.clone()),
            error_kind: error.map(|e| e.kind),
            direct_delivery_target: descriptor.direct_delivery_target.clone(),
        }
    }
}

/// Body of the redirect sent when a render outlives the wait window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingJob {
    pub job_code: JobCode,
    pub poll_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::job::{Artifact, JobFailure, Origin};
    use std::path::PathBuf;

    fn descriptor() -> JobDescriptor {
        JobDescriptor::new(
            JobCode::generate(),
            "alice",
            Origin {
                plugin_ref: "billing".to_string(),
                report_ref: "invoice".to_string(),
            },
            Some("printer-1".to_string()),
        )
    }

    #[test]
    fn test_running_status() {
        let status = JobStatus::from(&descriptor());
        assert_eq!(status.phase, JobPhase::Running);
        assert_eq!(status.percent_completed, 0);
        assert!(!status.is_terminal());
        assert!(status.error.is_none());
        assert!(status.mime_type.is_none());
    }

    #[test]
    fn test_completed_status_hides_artifact_path() {
        let d = descriptor().completed(Artifact {
            path: PathBuf::from("/srv/out/secret.txt"),
            mime_type: "text/plain".to_string(),
            suggested_file_name: "invoice.txt".to_string(),
        });
        let status = JobStatus::from(&d);
        assert_eq!(status.phase, JobPhase::Completed);
        assert_eq!(status.percent_completed, 100);
        assert_eq!(status.suggested_file_name.as_deref(), Some("invoice.txt"));

        let json = serde_json::to_string(&status).unwrap();
        assert!(!json.contains("/srv/out"));
    }

    #[test]
    fn test_failed_status() {
        let d = descriptor().failed(JobFailure::render("template missing"));
        let status = JobStatus::from(&d);
        assert_eq!(status.phase, JobPhase::Failed);
        assert_eq!(status.error.as_deref(), Some("template missing"));
        assert_eq!(status.error_kind, Some(FailureKind::Render));
        assert!(status.mime_type.is_none());
    }
}
