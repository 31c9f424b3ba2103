//! Polling service
//!
//! Answers status requests for jobs that outlived their wait window. Every
//! lookup goes through the job cache, so a probe on a stale job evicts it
//! and a probe on a running job keeps it alive.

use std::sync::Arc;

use presto_core::domain::job::{JobCode, JobDescriptor};
use tracing::debug;

use crate::job_cache::JobCache;

/// Read-only view over jobs awaiting polling
#[derive(Clone)]
pub struct PollingService {
    jobs: Arc<JobCache>,
}

impl PollingService {
    pub fn new(jobs: Arc<JobCache>) -> Self {
        Self { jobs }
    }

    /// Current descriptor of a job
    ///
    /// Returns `None` for codes that were never issued, jobs that finished
    /// within their wait window, and jobs already evicted.
    pub fn refresh(&self, code: JobCode) -> Option<Arc<JobDescriptor>> {
        let job = self.jobs.get(code);
        if job.is_none() {
            debug!("Poll for unknown job {}", code);
        }
        job.map(|job| job.descriptor())
    }

    /// Descriptors of every retained job, oldest first
    ///
    /// Listing does not count as a refresh.
    pub fn list(&self) -> Vec<Arc<JobDescriptor>> {
        let mut descriptors: Vec<_> = self
            .jobs
            .list()
            .iter()
            .map(|job| job.descriptor())
            .collect();
        descriptors.sort_by_key(|d| d.started_at);
        descriptors
    }
}
