//! Request de-duplication and artifact reuse
//!
//! Entries are keyed by requester scope and request signature. While a render
//! is in flight the entry is an `InProgress` sentinel; once the render
//! succeeds it becomes `Ready` and can be handed out again for a short
//! freshness window, as long as the artifact file still exists.
//!
//! Filesystem checks never run while the store is locked. A file deleted
//! between the existence check and the claim is handed out anyway, and its
//! download then reports the artifact as gone.
//!
//! Every terminal job outcome must resolve its sentinel exactly once
//! (`mark_ready` on success, `clear` on failure). [`SentinelGuard`] enforces
//! this for the dispatcher: dropping an unresolved guard clears the entry.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use presto_core::domain::job::JobDescriptor;
use presto_core::domain::report::Signature;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::store::{EntryStore, MemoryStore};

/// Key of a dedup entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub scope: String,
    pub signature: Signature,
}

impl DedupKey {
    pub fn new(scope: &str, signature: &Signature) -> Self {
        Self {
            scope: scope.to_string(),
            signature: signature.clone(),
        }
    }
}

/// Value of a dedup entry
#[derive(Debug, Clone)]
pub enum DedupEntry {
    /// A render for this request is in flight
    InProgress,
    Ready(ReadyArtifact),
}

/// Output of a finished render, kept for reuse
#[derive(Debug, Clone)]
pub struct ReadyArtifact {
    pub descriptor: Arc<JobDescriptor>,
    pub artifact_path: PathBuf,
    pub produced_at: Instant,
}

impl ReadyArtifact {
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.produced_at)
    }

    /// Within the freshness window
    pub fn is_young(&self, now: Instant, freshness: Duration) -> bool {
        self.age(now) < freshness
    }
}

/// Result of [`DedupCache::lookup`]
#[derive(Debug, Clone)]
pub enum Lookup {
    Absent,
    InProgress,
    Ready {
        descriptor: Arc<JobDescriptor>,
        artifact_path: PathBuf,
        age: Duration,
    },
}

/// Result of [`DedupCache::claim`]
#[derive(Debug, Clone)]
pub enum Claim {
    /// The caller now owns the sentinel and must start the render
    Granted,
    /// Another render for the same request is in flight
    InFlight,
    /// A fresh artifact for the same request already exists
    Reusable(Arc<JobDescriptor>),
}

/// Per-requester cache of in-flight markers and reusable artifacts
pub struct DedupCache {
    store: Arc<dyn EntryStore<DedupKey, DedupEntry>>,
    freshness: Duration,
}

impl DedupCache {
    /// Creates an in-memory cache
    pub fn new(freshness: Duration) -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), freshness)
    }

    pub fn with_store(store: Arc<dyn EntryStore<DedupKey, DedupEntry>>, freshness: Duration) -> Self {
        Self { store, freshness }
    }

    pub fn freshness(&self) -> Duration {
        self.freshness
    }

    /// Reports the entry for `(scope, signature)` without changing it
    pub fn lookup(&self, scope: &str, signature: &Signature) -> Lookup {
        match self.store.get(&DedupKey::new(scope, signature)) {
            None => Lookup::Absent,
            Some(DedupEntry::InProgress) => Lookup::InProgress,
            Some(DedupEntry::Ready(ready)) => Lookup::Ready {
                age: ready.age(Instant::now()),
                descriptor: ready.descriptor,
                artifact_path: ready.artifact_path,
            },
        }
    }

    pub fn mark_in_progress(&self, scope: &str, signature: &Signature) {
        self.store
            .put(DedupKey::new(scope, signature), DedupEntry::InProgress);
    }

    pub fn mark_ready(
        &self,
        scope: &str,
        signature: &Signature,
        descriptor: Arc<JobDescriptor>,
        artifact_path: PathBuf,
    ) {
        debug!("Artifact ready for {} in scope {}", signature, scope);
        self.store.put(
            DedupKey::new(scope, signature),
            DedupEntry::Ready(ReadyArtifact {
                descriptor,
                artifact_path,
                produced_at: Instant::now(),
            }),
        );
    }

    pub fn clear(&self, scope: &str, signature: &Signature) {
        self.store.evict(&DedupKey::new(scope, signature));
    }

    /// Atomically decides whether the caller may start a render
    ///
    /// An absent entry, or a stale `Ready` one, is replaced by an
    /// `InProgress` sentinel owned by the caller. A stale artifact file is
    /// deleted. A `Ready` entry whose file is missing counts as stale.
    pub fn claim(&self, scope: &str, signature: &Signature) -> Claim {
        let key = DedupKey::new(scope, signature);
        let missing = match self.store.get(&key) {
            Some(DedupEntry::Ready(ready)) if !ready.artifact_path.exists() => {
                Some(ready.artifact_path)
            }
            _ => None,
        };

        let now = Instant::now();
        let freshness = self.freshness;
        let mut claim = Claim::Granted;
        let mut stale: Option<PathBuf> = None;

        self.store.update(&key, &mut |current| match current {
            Some(DedupEntry::InProgress) => {
                claim = Claim::InFlight;
                Some(DedupEntry::InProgress)
            }
            Some(DedupEntry::Ready(ready))
                if ready.is_young(now, freshness)
                    && missing.as_ref() != Some(&ready.artifact_path) =>
            {
                claim = Claim::Reusable(ready.descriptor.clone());
                Some(DedupEntry::Ready(ready))
            }
            Some(DedupEntry::Ready(ready)) => {
                stale = Some(ready.artifact_path);
                claim = Claim::Granted;
                Some(DedupEntry::InProgress)
            }
            None => {
                claim = Claim::Granted;
                Some(DedupEntry::InProgress)
            }
        });

        if let Some(path) = stale {
            debug!("Discarding stale artifact for {}", signature);
            remove_artifact(&path);
        }

        claim
    }

    /// Drops every `Ready` entry that is no longer fresh and deletes its file
    ///
    /// Entries for which `pinned` holds keep their file and stay until a
    /// later purge: their job can still be polled and its artifact
    /// downloaded. Stale entries are never reused either way. Sentinels are
    /// never touched. Returns the number of entries removed.
    pub fn purge_stale(&self, pinned: impl Fn(&JobDescriptor) -> bool) -> usize {
        let now = Instant::now();
        let freshness = self.freshness;
        let mut stale = Vec::new();

        self.store.retain(&mut |_, entry| match entry {
            DedupEntry::InProgress => true,
            DedupEntry::Ready(ready) if ready.is_young(now, freshness) => true,
            DedupEntry::Ready(ready) if pinned(&*ready.descriptor) => true,
            DedupEntry::Ready(ready) => {
                stale.push(ready.artifact_path.clone());
                false
            }
        });

        for path in &stale {
            remove_artifact(path);
        }
        stale.len()
    }

    /// Number of entries, in progress or ready
    pub fn len(&self) -> usize {
        self.store.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn remove_artifact(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to delete stale artifact {}: {}", path.display(), e),
    }
}

/// Ownership of an `InProgress` sentinel
///
/// Resolve it with [`SentinelGuard::ready`] or [`SentinelGuard::clear`].
/// Dropping an unresolved guard clears the sentinel, so a worker that dies
/// mid-render can never block later identical requests.
pub struct SentinelGuard {
    cache: Arc<DedupCache>,
    scope: String,
    signature: Signature,
    resolved: bool,
}

impl SentinelGuard {
    pub fn new(cache: Arc<DedupCache>, scope: &str, signature: Signature) -> Self {
        Self {
            cache,
            scope: scope.to_string(),
            signature,
            resolved: false,
        }
    }

    pub fn ready(mut self, descriptor: Arc<JobDescriptor>, artifact_path: PathBuf) {
        self.cache
            .mark_ready(&self.scope, &self.signature, descriptor, artifact_path);
        self.resolved = true;
    }

    pub fn clear(mut self) {
        self.cache.clear(&self.scope, &self.signature);
        self.resolved = true;
    }
}

impl Drop for SentinelGuard {
    fn drop(&mut self) {
        if !self.resolved {
            warn!(
                "Releasing unresolved sentinel for {} in scope {}",
                self.signature, self.scope
            );
            self.cache.clear(&self.scope, &self.signature);
        }
    }
}
