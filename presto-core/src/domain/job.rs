//! Job domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque handle for one rendering attempt
///
/// Random, so concurrent submissions can never collide. Clients use it to
/// poll for the job's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobCode(Uuid);

impl JobCode {
    /// Issues a fresh job code
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for JobCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobCode {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Identity of the report a job renders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    pub plugin_ref: String,
    pub report_ref: String,
}

/// Output of a successful render
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Location of the rendered file on the server
    pub path: PathBuf,
    pub mime_type: String,
    pub suggested_file_name: String,
}

/// Why a job failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The renderer returned an error
    Render,

    /// The worker stopped without recording any result
    Orphaned,
}

/// Failure captured from a job's worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl JobFailure {
    pub fn render(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Render,
            message: message.into(),
        }
    }

    pub fn orphaned() -> Self {
        Self {
            kind: FailureKind::Orphaned,
            message: "render worker terminated without producing a result".to_string(),
        }
    }
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Where a job stands
///
/// An artifact and an error can never be present together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobState {
    Running,
    Completed { artifact: Artifact },
    Failed { error: JobFailure },
}

/// Externally observable status and result of a job
///
/// Descriptors are immutable snapshots. Each transition produces a new
/// descriptor; a terminal descriptor never changes again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub job_code: JobCode,
    pub requesting_user: String,
    pub origin: Origin,
    pub started_at: DateTime<Utc>,
    /// Out-of-band destination for the artifact (e.g. a printer queue)
    pub direct_delivery_target: Option<String>,
    pub state: JobState,
}

impl JobDescriptor {
    /// Creates the descriptor of a job that has not produced anything yet
    pub fn new(
        job_code: JobCode,
        requesting_user: impl Into<String>,
        origin: Origin,
        direct_delivery_target: Option<String>,
    ) -> Self {
        Self {
            job_code,
            requesting_user: requesting_user.into(),
            origin,
            started_at: Utc::now(),
            direct_delivery_target,
            state: JobState::Running,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self.state, JobState::Running)
    }

    /// Coarse progress: 0 while running, 100 once terminal
    pub fn percent_completed(&self) -> u8 {
        if self.is_terminal() { 100 } else { 0 }
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        match &self.state {
            JobState::Completed { artifact } => Some(artifact),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&JobFailure> {
        match &self.state {
            JobState::Failed { error } => Some(error),
            _ => None,
        }
    }

    /// Snapshot of this job after a successful render
    pub fn completed(&self, artifact: Artifact) -> Self {
        self.with_state(JobState::Completed { artifact })
    }

    /// Snapshot of this job after a failure
    pub fn failed(&self, error: JobFailure) -> Self {
        self.with_state(JobState::Failed { error })
    }

    fn with_state(&self, state: JobState) -> Self {
        Self {
            state,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> JobDescriptor {
        JobDescriptor::new(
            JobCode::generate(),
            "alice",
            Origin {
                plugin_ref: "billing".to_string(),
                report_ref: "invoice".to_string(),
            },
            None,
        )
    }

    fn artifact() -> Artifact {
        Artifact {
            path: PathBuf::from("/tmp/invoice.txt"),
            mime_type: "text/plain".to_string(),
            suggested_file_name: "invoice.txt".to_string(),
        }
    }

    #[test]
    fn test_new_descriptor_is_running() {
        let d = descriptor();
        assert!(!d.is_terminal());
        assert_eq!(d.percent_completed(), 0);
        assert!(d.artifact().is_none());
        assert!(d.error().is_none());
    }

    #[test]
    fn test_completed_descriptor_has_only_artifact() {
        let d = descriptor().completed(artifact());
        assert!(d.is_terminal());
        assert_eq!(d.percent_completed(), 100);
        assert_eq!(d.artifact(), Some(&artifact()));
        assert!(d.error().is_none());
    }

    #[test]
    fn test_failed_descriptor_has_only_error() {
        let d = descriptor().failed(JobFailure::render("boom"));
        assert!(d.is_terminal());
        assert_eq!(d.percent_completed(), 100);
        assert!(d.artifact().is_none());
        assert_eq!(d.error().map(|e| e.kind), Some(FailureKind::Render));
    }

    #[test]
    fn test_transition_keeps_identity() {
        let running = descriptor();
        let done = running.completed(artifact());
        assert_eq!(running.job_code, done.job_code);
        assert_eq!(running.started_at, done.started_at);
        assert_eq!(running.requesting_user, done.requesting_user);
    }

    #[test]
    fn test_job_code_round_trips_through_text() {
        let code = JobCode::generate();
        let parsed: JobCode = code.to_string().parse().unwrap();
        assert_eq!(code, parsed);
        assert!("not-a-code".parse::<JobCode>().is_err());
    }

    #[test]
    fn test_job_codes_are_unique() {
        let codes: std::collections::HashSet<_> = (0..1000).map(|_| JobCode::generate()).collect();
        assert_eq!(codes.len(), 1000);
    }

    #[test]
    fn test_state_serializes_with_status_tag() {
        let d = descriptor().failed(JobFailure::orphaned());
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["state"]["status"], "failed");
        assert_eq!(json["state"]["error"]["kind"], "orphaned");
    }
}
