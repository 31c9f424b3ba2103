//! Presto job engine
//!
//! Renders reports on behalf of callers, blocking for a short wait window
//! and falling back to polling for slow renders.
//!
//! Architecture:
//! - Dispatcher: runs the dispatch protocol for each request
//! - Jobs: one worker task per rendering attempt, publishing descriptor snapshots
//! - Job cache: keeps slow jobs pollable, evicting only what has stopped running
//! - Dedup cache: suppresses identical in-flight requests and reuses fresh artifacts
//! - Services: pluggable renderer, print code resolver and delivery sink
//! - Scheduler: background sweeping of both caches

pub mod config;
pub mod dedup;
pub mod dispatcher;
pub mod error;
pub mod job;
pub mod job_cache;
mod lock;
pub mod polling;
pub mod scheduler;
pub mod service;
pub mod store;

pub use config::Config;
pub use dedup::{Claim, DedupCache, Lookup, SentinelGuard};
pub use dispatcher::{Dispatcher, Outcome};
pub use error::{ConfigError, DispatchError, JobError};
pub use job::{DescriptorPublisher, Job};
pub use job_cache::JobCache;
pub use polling::PollingService;
pub use scheduler::{CacheSweeper, SweepReport};
pub use store::{EntryStore, MemoryStore};
