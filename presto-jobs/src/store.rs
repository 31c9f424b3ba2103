//! Storage backends for the engine's caches
//!
//! Both the job cache and the dedup cache keep their entries in an
//! [`EntryStore`]. The caches own the eviction policy; a store only has to
//! offer keyed access and an atomic read-modify-write.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;

use crate::lock::mutex_lock;

const SOURCE: &str = "store";

/// Keyed storage with an atomic update primitive
pub trait EntryStore<K, V>: Send + Sync {
    fn get(&self, key: &K) -> Option<V>;

    fn put(&self, key: K, value: V);

    /// Removes and returns the entry under `key`
    fn evict(&self, key: &K) -> Option<V>;

    /// Atomically replaces the entry under `key`
    ///
    /// `f` is called exactly once with the current value and returns the
    /// value to keep, or `None` to remove the entry. No other operation on
    /// the store interleaves with `f`.
    fn update(&self, key: &K, f: &mut dyn FnMut(Option<V>) -> Option<V>);

    /// Keeps only the entries for which `f` returns true, atomically
    fn retain(&self, f: &mut dyn FnMut(&K, &mut V) -> bool);

    /// Copy of every entry, in no particular order
    fn entries(&self) -> Vec<(K, V)>;
}

/// In-process store backed by a mutex-guarded hash map
pub struct MemoryStore<K, V> {
    entries: Mutex<HashMap<K, V>>,
}

impl<K, V> MemoryStore<K, V> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, V> Default for MemoryStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> EntryStore<K, V> for MemoryStore<K, V>
where
    K: Eq + Hash + Clone + Send,
    V: Clone + Send,
{
    fn get(&self, key: &K) -> Option<V> {
        mutex_lock(&self.entries, SOURCE, "get").get(key).cloned()
    }

    fn put(&self, key: K, value: V) {
        mutex_lock(&self.entries, SOURCE, "put").insert(key, value);
    }

    fn evict(&self, key: &K) -> Option<V> {
        mutex_lock(&self.entries, SOURCE, "evict").remove(key)
    }

    fn update(&self, key: &K, f: &mut dyn FnMut(Option<V>) -> Option<V>) {
        let mut entries = mutex_lock(&self.entries, SOURCE, "update");
        let current = entries.remove(key);
        if let Some(next) = f(current) {
            entries.insert(key.clone(), next);
        }
    }

    fn retain(&self, f: &mut dyn FnMut(&K, &mut V) -> bool) {
        mutex_lock(&self.entries, SOURCE, "retain").retain(|k, v| f(k, v));
    }

    fn entries(&self) -> Vec<(K, V)> {
        mutex_lock(&self.entries, SOURCE, "entries")
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
