//! A single rendering attempt and its worker task
//!
//! The worker is the only writer of a job's descriptor. It publishes whole
//! immutable snapshots through a watch channel, so readers always see a
//! consistent descriptor and never a half-written terminal state.
//!
//! Liveness comes from the worker's join handle alone. A worker that dies
//! without publishing a result (a panicking renderer) leaves the stored
//! descriptor untouched; readers see it as an orphaned failure.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use presto_core::domain::job::{JobCode, JobDescriptor, JobFailure};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::error::JobError;
use crate::lock::mutex_lock;

const SOURCE: &str = "job";

/// How often a waiter checks the join handle once the publisher is gone
const LIVENESS_POLL: Duration = Duration::from_millis(10);

/// A rendering attempt: one descriptor plus the task working on it
pub struct Job {
    code: JobCode,
    snapshots: watch::Receiver<Arc<JobDescriptor>>,
    publisher: Mutex<Option<DescriptorPublisher>>,
    worker: OnceLock<JoinHandle<()>>,
}

impl Job {
    /// Creates a job that has not been started yet
    pub fn new(descriptor: JobDescriptor) -> Self {
        let code = descriptor.job_code;
        let (sender, snapshots) = watch::channel(Arc::new(descriptor));

        Self {
            code,
            snapshots,
            publisher: Mutex::new(Some(DescriptorPublisher { sender })),
            worker: OnceLock::new(),
        }
    }

    pub fn code(&self) -> JobCode {
        self.code
    }

    /// Spawns the worker task
    ///
    /// `work` receives the job's only publisher. A job can be started once;
    /// later calls return [`JobError::AlreadyStarted`] without running `work`.
    pub fn start<F, Fut>(&self, work: F) -> Result<(), JobError>
    where
        F: FnOnce(DescriptorPublisher) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let publisher = mutex_lock(&self.publisher, SOURCE, "start")
            .take()
            .ok_or(JobError::AlreadyStarted(self.code))?;

        let handle = tokio::spawn(work(publisher));
        // The publisher can only be taken once, so the slot is always empty here.
        let _ = self.worker.set(handle);

        Ok(())
    }

    /// True while the worker task is alive
    pub fn is_running(&self) -> bool {
        self.worker.get().is_some_and(|handle| !handle.is_finished())
    }

    /// Current snapshot, with a dead worker's silence reported as orphaned
    pub fn descriptor(&self) -> Arc<JobDescriptor> {
        let worker_gone = self
            .worker
            .get()
            .is_some_and(|handle| handle.is_finished());
        settle(self.published(), worker_gone)
    }

    /// Descriptor exactly as the worker last published it
    pub fn published(&self) -> Arc<JobDescriptor> {
        self.snapshots.borrow().clone()
    }

    /// Waits up to `window` for the job to reach a terminal state
    ///
    /// Returns the terminal (or orphaned) snapshot, or `None` if the job is
    /// still running when the window elapses. The job itself is unaffected
    /// by the deadline.
    pub async fn wait_terminal(&self, window: Duration) -> Option<Arc<JobDescriptor>> {
        tokio::time::timeout(window, self.terminal()).await.ok()
    }

    async fn terminal(&self) -> Arc<JobDescriptor> {
        let mut snapshots = self.snapshots.clone();
        if let Ok(descriptor) = snapshots.wait_for(|d| d.is_terminal()).await {
            return descriptor.clone();
        }

        // The publisher is gone, but only the join handle says the worker is.
        while self.is_running() {
            tokio::time::sleep(LIVENESS_POLL).await;
        }
        settle(self.published(), true)
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("code", &self.code)
            .field("running", &self.is_running())
            .finish()
    }
}

fn settle(current: Arc<JobDescriptor>, worker_gone: bool) -> Arc<JobDescriptor> {
    if worker_gone && !current.is_terminal() {
        Arc::new(current.failed(JobFailure::orphaned()))
    } else {
        current
    }
}

/// Write side of a job's descriptor, owned by its worker
pub struct DescriptorPublisher {
    sender: watch::Sender<Arc<JobDescriptor>>,
}

impl DescriptorPublisher {
    pub fn current(&self) -> Arc<JobDescriptor> {
        self.sender.borrow().clone()
    }

    /// Publishes a terminal descriptor
    ///
    /// Terminal descriptors are write-once: returns false and leaves the
    /// published value alone if the job already reached a terminal state.
    pub fn publish_terminal(&self, descriptor: Arc<JobDescriptor>) -> bool {
        let code = descriptor.job_code;
        let published = self.sender.send_if_modified(|current| {
            if current.is_terminal() {
                false
            } else {
                *current = descriptor;
                true
            }
        });

        if !published {
            warn!("Ignoring second terminal state for job {}", code);
        }
        published
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use presto_core::domain::job::{Artifact, FailureKind, Origin};
    use std::path::PathBuf;

    fn new_job() -> Job {
        Job::new(JobDescriptor::new(
            JobCode::generate(),
            "alice",
            Origin {
                plugin_ref: "billing".to_string(),
                report_ref: "invoice".to_string(),
            },
            None,
        ))
    }

    fn artifact() -> Artifact {
        Artifact {
            path: PathBuf::from("/tmp/invoice.txt"),
            mime_type: "text/plain".to_string(),
            suggested_file_name: "invoice.txt".to_string(),
        }
    }

    async fn until_stopped(job: &Job) {
        while job.is_running() {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_unstarted_job_is_not_running() {
        let job = new_job();
        assert!(!job.is_running());
        assert!(!job.descriptor().is_terminal());
    }

    #[tokio::test]
    async fn test_job_cannot_start_twice() {
        let job = new_job();
        job.start(|publisher| async move {
            let _publisher = publisher;
            std::future::pending::<()>().await
        })
        .unwrap();
        assert!(job.is_running());

        let second = job.start(|_publisher| async {});
        assert_eq!(second, Err(JobError::AlreadyStarted(job.code())));
    }

    #[tokio::test]
    async fn test_worker_publishes_completion() {
        let job = new_job();
        job.start(|publisher| async move {
            let done = Arc::new(publisher.current().completed(artifact()));
            publisher.publish_terminal(done);
        })
        .unwrap();

        let terminal = job.wait_terminal(Duration::from_secs(5)).await.unwrap();
        assert_eq!(terminal.artifact(), Some(&artifact()));
        assert_eq!(terminal.percent_completed(), 100);

        until_stopped(&job).await;
        assert_eq!(job.descriptor(), terminal);
    }

    #[tokio::test]
    async fn test_terminal_state_is_write_once() {
        let job = new_job();
        job.start(|publisher| async move {
            let failed = Arc::new(publisher.current().failed(JobFailure::render("boom")));
            assert!(publisher.publish_terminal(failed));

            let late = Arc::new(publisher.current().completed(artifact()));
            assert!(!publisher.publish_terminal(late));
        })
        .unwrap();

        until_stopped(&job).await;
        let descriptor = job.descriptor();
        assert_eq!(descriptor.error().map(|e| e.message.as_str()), Some("boom"));
        assert!(descriptor.artifact().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_times_out_while_running() {
        let job = new_job();
        job.start(|publisher| async move {
            let _publisher = publisher;
            tokio::time::sleep(Duration::from_secs(30)).await;
        })
        .unwrap();

        assert!(job.wait_terminal(Duration::from_secs(10)).await.is_none());
        assert!(job.is_running());
        assert!(!job.descriptor().is_terminal());
    }

    #[tokio::test(start_paused = true)]
    async fn test_worker_without_publisher_is_running_until_it_exits() {
        let job = new_job();
        job.start(|_publisher| async {
            tokio::time::sleep(Duration::from_secs(30)).await;
        })
        .unwrap();

        assert!(job.wait_terminal(Duration::from_secs(10)).await.is_none());
        assert!(job.is_running());
        assert!(!job.descriptor().is_terminal());

        let terminal = job.wait_terminal(Duration::from_secs(30)).await.unwrap();
        assert_eq!(terminal.error().map(|e| e.kind), Some(FailureKind::Orphaned));
        assert!(!job.is_running());
    }

    #[tokio::test]
    async fn test_panicking_worker_is_orphaned() {
        let job = new_job();
        job.start(|publisher| async move {
            let _publisher = publisher;
            panic!("renderer ran out of memory");
        })
        .unwrap();

        let terminal = job.wait_terminal(Duration::from_secs(5)).await.unwrap();
        assert_eq!(terminal.error().map(|e| e.kind), Some(FailureKind::Orphaned));

        until_stopped(&job).await;
        // The stored descriptor never recorded anything.
        assert!(!job.published().is_terminal());
        assert_eq!(
            job.descriptor().error().map(|e| e.kind),
            Some(FailureKind::Orphaned)
        );
    }
}
