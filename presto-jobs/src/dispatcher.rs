//! Job dispatcher
//!
//! Turns a render request into an answer for the caller:
//!
//! 1. Consult the dedup cache. A request already in flight for the same
//!    requester answers `DuplicateInFlight`; a fresh artifact for it answers
//!    `Ready` without rendering again.
//! 2. Otherwise claim the request, start a job and wait up to the wait
//!    window for it to finish.
//! 3. A job that finishes in time answers `Ready` or `Failed` directly.
//! 4. A job still running at the deadline is registered in the job cache
//!    and the caller gets `Pending(job_code)` to poll with.
//!
//! The job's worker resolves the dedup sentinel itself (ready on success,
//! cleared on failure or worker death), so the same completion path serves
//! both the synchronous and the polling case.

use std::sync::Arc;
use std::time::Duration;

use presto_core::domain::job::{JobCode, JobDescriptor, JobFailure, JobState};
use presto_core::domain::report::{ReportParams, ReportTarget, RequestContext, Signature};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::dedup::{Claim, DedupCache, SentinelGuard};
use crate::error::DispatchError;
use crate::job::{DescriptorPublisher, Job};
use crate::job_cache::JobCache;
use crate::service::{
    CatalogResolver, DeliverySink, NoDelivery, RenderRequest, Renderer, ReportResolver,
};

/// What a dispatch call tells its caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The artifact is available now
    Ready(Arc<JobDescriptor>),

    /// Rendering continues in the background; poll with this code
    Pending(JobCode),

    /// An identical request is already being rendered; nothing was started
    DuplicateInFlight,

    /// The render failed within the wait window
    Failed(JobFailure),
}

/// Orchestrates the dedup cache, jobs and the job cache
pub struct Dispatcher {
    config: Config,
    jobs: Arc<JobCache>,
    dedup: Arc<DedupCache>,
    renderer: Arc<dyn Renderer>,
    resolver: Arc<dyn ReportResolver>,
    delivery: Arc<dyn DeliverySink>,
}

impl Dispatcher {
    /// Creates a dispatcher without print code resolution or delivery
    pub fn new(
        config: Config,
        jobs: Arc<JobCache>,
        dedup: Arc<DedupCache>,
        renderer: Arc<dyn Renderer>,
    ) -> Self {
        Self {
            config,
            jobs,
            dedup,
            renderer,
            resolver: Arc::new(CatalogResolver::empty()),
            delivery: Arc::new(NoDelivery),
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn ReportResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_delivery(mut self, delivery: Arc<dyn DeliverySink>) -> Self {
        self.delivery = delivery;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn jobs(&self) -> &Arc<JobCache> {
        &self.jobs
    }

    pub fn dedup(&self) -> &Arc<DedupCache> {
        &self.dedup
    }

    /// Dispatches a report identified by a print code
    ///
    /// Resolution failures are returned as errors; no job is created and the
    /// caches are left alone.
    pub async fn dispatch_print_code(
        &self,
        context: RequestContext,
        print_code: &str,
        params: ReportParams,
    ) -> Result<Outcome, DispatchError> {
        let resolved = self
            .resolver
            .resolve(print_code, params)
            .await
            .map_err(|e| DispatchError::resolve(print_code, &e))?;

        Ok(self
            .dispatch_report(context, resolved.target, resolved.params)
            .await)
    }

    /// Dispatches an explicitly identified report
    pub async fn dispatch_report(
        &self,
        context: RequestContext,
        target: ReportTarget,
        params: ReportParams,
    ) -> Outcome {
        let signature =
            Signature::of_request(&target, &params, context.delivery_target.as_deref());
        let request = RenderRequest {
            target,
            params,
            context,
        };
        self.dispatch(signature, request, self.config.wait_window)
            .await
    }

    /// Runs the dispatch protocol for one request
    pub async fn dispatch(
        &self,
        signature: Signature,
        request: RenderRequest,
        wait_window: Duration,
    ) -> Outcome {
        let scope = request.context.scope.clone();

        match self.dedup.claim(&scope, &signature) {
            Claim::InFlight => {
                debug!("Request {} already in flight for scope {}", signature, scope);
                return Outcome::DuplicateInFlight;
            }
            Claim::Reusable(descriptor) => {
                debug!(
                    "Reusing artifact of job {} for request {}",
                    descriptor.job_code, signature
                );
                return Outcome::Ready(descriptor);
            }
            Claim::Granted => {}
        }

        let sentinel = SentinelGuard::new(self.dedup.clone(), &scope, signature);
        let descriptor = JobDescriptor::new(
            JobCode::generate(),
            request.context.user_id.clone(),
            request.target.origin(),
            request.context.delivery_target.clone(),
        );
        let code = descriptor.job_code;
        let job = Arc::new(Job::new(descriptor));

        info!(
            "Starting job {} for {}/{} (user {})",
            code, request.target.plugin_ref, request.target.report_ref, request.context.user_id
        );

        let renderer = self.renderer.clone();
        let delivery = self.delivery.clone();
        if let Err(e) = job.start(move |publisher| {
            let completion = Completion {
                sentinel,
                publisher,
            };
            run_render(completion, renderer, delivery, request)
        }) {
            // Dropping the closure released the sentinel.
            warn!("Failed to start job {}: {}", code, e);
            return Outcome::Failed(JobFailure::render(e.to_string()));
        }

        if let Some(terminal) = job.wait_terminal(wait_window).await {
            match &terminal.state {
                JobState::Completed { .. } => return Outcome::Ready(Arc::clone(&terminal)),
                JobState::Failed { error } => return Outcome::Failed(error.clone()),
                JobState::Running => {}
            }
        }

        info!(
            "Job {} still running after {:?}, switching to polling",
            code, wait_window
        );
        self.jobs.put(code, job, self.config.job_cache_ttl);
        Outcome::Pending(code)
    }
}

/// Everything a worker needs to finish its job
///
/// Fields drop in declaration order: the sentinel is released before the
/// publisher closes the channel, so anyone woken by the closed channel
/// already sees the cleared entry.
struct Completion {
    sentinel: SentinelGuard,
    publisher: DescriptorPublisher,
}

async fn run_render(
    completion: Completion,
    renderer: Arc<dyn Renderer>,
    delivery: Arc<dyn DeliverySink>,
    request: RenderRequest,
) {
    // Kept whole so an unwinding worker drops the fields in order.
    let running = completion.publisher.current();
    let code = running.job_code;

    match renderer.render(&request).await {
        Ok(artifact) => {
            let done = Arc::new(running.completed(artifact.clone()));
            completion.sentinel.ready(done.clone(), artifact.path.clone());
            completion.publisher.publish_terminal(done.clone());

            info!(
                "Job {} completed: {} ({})",
                code, artifact.suggested_file_name, artifact.mime_type
            );

            if let Some(target) = &done.direct_delivery_target {
                if let Err(e) = delivery.deliver(target, &done, &artifact).await {
                    warn!("Delivery of job {} to '{}' failed: {:#}", code, target, e);
                }
            }
        }
        Err(e) => {
            let failure = JobFailure::render(format!("{:#}", e));
            warn!("Job {} failed: {}", code, failure);
            completion.sentinel.clear();
            completion
                .publisher
                .publish_terminal(Arc::new(running.failed(failure)));
        }
    }
}
