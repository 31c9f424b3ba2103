//! Cache sweeper
//!
//! Periodically applies the eviction policies of the job cache and the
//! dedup cache. Jobs are swept first; an artifact stays on disk for as long
//! as its job remains pollable.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

use crate::dedup::DedupCache;
use crate::job_cache::JobCache;

/// What one sweep removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub jobs_evicted: usize,
    pub artifacts_purged: usize,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.jobs_evicted == 0 && self.artifacts_purged == 0
    }
}

/// Sweeps both caches on a fixed interval
pub struct CacheSweeper {
    jobs: Arc<JobCache>,
    dedup: Arc<DedupCache>,
    interval: Duration,
}

impl CacheSweeper {
    pub fn new(jobs: Arc<JobCache>, dedup: Arc<DedupCache>, interval: Duration) -> Self {
        Self {
            jobs,
            dedup,
            interval,
        }
    }

    /// Performs a single sweep
    pub fn sweep_once(&self) -> SweepReport {
        let jobs_evicted = self.jobs.sweep();
        let artifacts_purged = self
            .dedup
            .purge_stale(|descriptor| self.jobs.contains(descriptor.job_code));

        SweepReport {
            jobs_evicted,
            artifacts_purged,
        }
    }

    /// Runs the sweep loop forever
    pub async fn run(self) {
        info!("Starting cache sweeper (interval: {:?})", self.interval);

        let mut interval = time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            let report = self.sweep_once();
            if report.is_empty() {
                debug!("Sweep found nothing to evict");
            } else {
                info!(
                    "Swept {} job(s) and {} artifact(s)",
                    report.jobs_evicted, report.artifacts_purged
                );
            }
        }
    }

    /// Spawns the sweep loop as a background task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::Job;
    use presto_core::domain::job::{JobCode, JobDescriptor, Origin};
    use presto_core::domain::report::{ReportParams, ReportTarget, Signature};

    const TTL: Duration = Duration::from_secs(60);
    const FRESHNESS: Duration = Duration::from_secs(10);

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

    fn signature(id: &str) -> Signature {
        let target = ReportTarget {
            plugin_ref: "billing".to_string(),
            report_ref: "invoice".to_string(),
            info: Default::default(),
        };
        let mut params = ReportParams::new();
        params.insert("id".to_string(), id.to_string());
        Signature::of(&target, &params)
    }

    async fn finished_job() -> Arc<Job> {
        let job = Arc::new(Job::new(descriptor()));
        job.start(|publisher| async move {
            let failed = publisher
                .current()
                .failed(presto_core::domain::job::JobFailure::render("boom"));
            publisher.publish_terminal(Arc::new(failed));
        })
        .unwrap();
        job.wait_terminal(Duration::from_secs(1)).await.unwrap();
        // Let the worker task run to completion.
        while job.is_running() {
            tokio::task::yield_now().await;
        }
        job
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_once_evicts_expired_entries() {
        let dir = tempfile::tempdir().unwrap();
        let jobs = Arc::new(JobCache::new());
        let dedup = Arc::new(DedupCache::new(FRESHNESS));
        let sweeper = CacheSweeper::new(jobs.clone(), dedup.clone(), TTL);

        let job = finished_job().await;
        jobs.put(job.code(), job, TTL);

        let artifact = dir.path().join("invoice.txt");
        std::fs::write(&artifact, "body").unwrap();
        dedup.mark_ready("s1", &signature("1"), Arc::new(descriptor()), artifact.clone());
        dedup.mark_in_progress("s1", &signature("2"));

        assert_eq!(sweeper.sweep_once(), SweepReport::default());

        time::advance(TTL + Duration::from_secs(1)).await;
        let report = sweeper.sweep_once();

        assert_eq!(report.jobs_evicted, 1);
        assert_eq!(report.artifacts_purged, 1);
        assert!(jobs.is_empty());
        assert!(!artifact.exists());
        // The in-flight sentinel survives.
        assert_eq!(dedup.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_artifact_of_pollable_job_survives_until_job_expires() {
        let dir = tempfile::tempdir().unwrap();
        let jobs = Arc::new(JobCache::new());
        let dedup = Arc::new(DedupCache::new(FRESHNESS));
        let sweeper = CacheSweeper::new(jobs.clone(), dedup.clone(), TTL);

        let job = finished_job().await;
        jobs.put(job.code(), job.clone(), TTL);

        let artifact = dir.path().join("polled.txt");
        std::fs::write(&artifact, "body").unwrap();
        dedup.mark_ready("s1", &signature("1"), job.descriptor(), artifact.clone());

        // Past freshness, well within the job's TTL.
        time::advance(FRESHNESS * 3).await;
        assert_eq!(sweeper.sweep_once(), SweepReport::default());
        assert!(jobs.contains(job.code()));
        assert!(artifact.exists());

        time::advance(TTL).await;
        let report = sweeper.sweep_once();
        assert_eq!(report.jobs_evicted, 1);
        assert_eq!(report.artifacts_purged, 1);
        assert!(!artifact.exists());
        assert!(dedup.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_sweeper_runs_on_interval() {
        let jobs = Arc::new(JobCache::new());
        let dedup = Arc::new(DedupCache::new(FRESHNESS));

        let job = finished_job().await;
        jobs.put(job.code(), job, TTL);

        let handle = CacheSweeper::new(jobs.clone(), dedup, TTL).spawn();

        // First tick fires immediately; nothing is stale yet.
        tokio::task::yield_now().await;
        assert_eq!(jobs.len(), 1);

        time::sleep(TTL * 2 + Duration::from_secs(1)).await;
        assert!(jobs.is_empty());

        handle.abort();
    }
}
