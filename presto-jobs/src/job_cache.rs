//! Liveness-aware job cache
//!
//! Jobs that outlive the dispatcher's wait window are kept here so clients
//! can poll them by job code. An entry is evictable only when its job has
//! stopped running *and* its TTL has elapsed since it was last refreshed.
//! Probing a running job refreshes it, so the TTL clock only starts once the
//! job is terminal.

use std::sync::Arc;
use std::time::Duration;

use presto_core::domain::job::JobCode;
use tokio::time::Instant;
use tracing::debug;

use crate::job::Job;
use crate::store::{EntryStore, MemoryStore};

/// A cached job with its refresh bookkeeping
#[derive(Debug, Clone)]
pub struct JobCacheEntry {
    job: Arc<Job>,
    last_refreshed: Instant,
    ttl: Duration,
}

impl JobCacheEntry {
    pub fn new(job: Arc<Job>, ttl: Duration, now: Instant) -> Self {
        Self {
            job,
            last_refreshed: now,
            ttl,
        }
    }

    pub fn job(&self) -> &Arc<Job> {
        &self.job
    }

    pub fn last_refreshed(&self) -> Instant {
        self.last_refreshed
    }

    pub fn is_running(&self) -> bool {
        self.job.is_running()
    }

    pub fn ttl_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_refreshed) > self.ttl
    }

    /// Restarts the TTL clock
    pub fn touch(&mut self, now: Instant) {
        self.last_refreshed = now;
    }

    pub fn evictable(&self, now: Instant) -> bool {
        !self.is_running() && self.ttl_expired(now)
    }

    /// Applies the eviction policy, refreshing a running job
    ///
    /// Returns whether the entry should be kept.
    fn probe(&mut self, now: Instant) -> bool {
        if self.is_running() {
            self.touch(now);
            return true;
        }
        !self.evictable(now)
    }
}

/// Cache of jobs awaiting polling, keyed by job code
pub struct JobCache {
    store: Arc<dyn EntryStore<JobCode, JobCacheEntry>>,
}

impl JobCache {
    /// Creates an in-memory cache
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    pub fn with_store(store: Arc<dyn EntryStore<JobCode, JobCacheEntry>>) -> Self {
        Self { store }
    }

    pub fn put(&self, code: JobCode, job: Arc<Job>, ttl: Duration) {
        debug!("Caching job {} for polling (ttl {:?})", code, ttl);
        self.store
            .put(code, JobCacheEntry::new(job, ttl, Instant::now()));
    }

    /// Looks up a job, evicting it first if it has gone stale
    pub fn get(&self, code: JobCode) -> Option<Arc<Job>> {
        let now = Instant::now();
        let mut found = None;

        self.store.update(&code, &mut |current| {
            let mut entry = current?;
            if entry.probe(now) {
                found = Some(entry.job.clone());
                Some(entry)
            } else {
                debug!("Evicting stale job {}", code);
                None
            }
        });

        found
    }

    /// Applies the eviction policy to every entry
    ///
    /// Returns the number of jobs evicted.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut evicted = 0;

        self.store.retain(&mut |code, entry| {
            let keep = entry.probe(now);
            if !keep {
                debug!("Evicting stale job {}", code);
                evicted += 1;
            }
            keep
        });

        evicted
    }

    /// Every retained job, without refreshing any of them
    pub fn list(&self) -> Vec<Arc<Job>> {
        self.store
            .entries()
            .into_iter()
            .map(|(_, entry)| entry.job)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.store.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a job is held, without applying the policy
    pub fn contains(&self, code: JobCode) -> bool {
        self.store.get(&code).is_some()
    }

    /// Inspects an entry without applying the policy
    pub fn peek(&self, code: JobCode) -> Option<JobCacheEntry> {
        self.store.get(&code)
    }
}

impl Default for JobCache {
    fn default() -> Self {
        Self::new()
    }
}
