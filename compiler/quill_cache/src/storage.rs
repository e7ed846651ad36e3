//! Where cache entries live.
//!
//! [`StrongStorage`] keeps everything until it is removed. [`MruStorage`]
//! keeps a bounded number of most recently used entries and drops the least
//! recently used one when full, standing in for a "drop under memory
//! pressure" policy.

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use indexmap::IndexMap;
use parking_lot::Mutex;
use rustc_hash::FxBuildHasher;

use crate::entry::{CacheEntry, CacheKey};

/// Storage policy of a [`TemplateCache`](crate::TemplateCache).
///
/// Implementations are shared between threads; every method takes `&self`.
pub trait CacheStorage: Send + Sync {
    fn get(&self, key: &CacheKey) -> Option<Arc<CacheEntry>>;

    fn put(&self, key: CacheKey, entry: Arc<CacheEntry>);

    fn remove(&self, key: &CacheKey);

    fn clear(&self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry last used before `cutoff`; returns how many went.
    fn evict_unused_since(&self, cutoff: Instant) -> usize;
}

/// Unbounded storage; lookups never take a lock beyond the map's shard
/// read lock.
#[derive(Default)]
pub struct StrongStorage {
    entries: DashMap<CacheKey, Arc<CacheEntry>, FxBuildHasher>,
}

impl StrongStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStorage for StrongStorage {
    fn get(&self, key: &CacheKey) -> Option<Arc<CacheEntry>> {
        self.entries.get(key).map(|entry| Arc::clone(entry.value()))
    }

    fn put(&self, key: CacheKey, entry: Arc<CacheEntry>) {
        self.entries.insert(key, entry);
    }

    fn remove(&self, key: &CacheKey) {
        self.entries.remove(key);
    }

    fn clear(&self) {
        self.entries.clear();
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn evict_unused_since(&self, cutoff: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.last_used() >= cutoff);
        before.saturating_sub(self.entries.len())
    }
}

/// Bounded storage ordered by recency of use.
///
/// Every lookup reorders the recency list under one mutex, so reads of any
/// key are serialised. Use [`StrongStorage`] where hot entries are read from
/// many threads at once.
pub struct MruStorage {
    capacity: usize,
    /// Least recently used first.
    entries: Mutex<IndexMap<CacheKey, Arc<CacheEntry>, FxBuildHasher>>,
}

impl MruStorage {
    /// Storage holding at most `capacity` entries (at least one).
    pub fn new(capacity: usize) -> Self {
        MruStorage {
            capacity: capacity.max(1),
            entries: Mutex::new(IndexMap::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl CacheStorage for MruStorage {
    fn get(&self, key: &CacheKey) -> Option<Arc<CacheEntry>> {
        let mut entries = self.entries.lock();
        let (key, entry) = entries.shift_remove_entry(key)?;
        entries.insert(key, Arc::clone(&entry));
        Some(entry)
    }

    fn put(&self, key: CacheKey, entry: Arc<CacheEntry>) {
        let mut entries = self.entries.lock();
        entries.shift_remove(&key);
        entries.insert(key, entry);
        while entries.len() > self.capacity {
            if let Some((dropped, _)) = entries.shift_remove_index(0) {
                tracing::trace!(template = %dropped.name, "dropped least recently used template");
            }
        }
    }

    fn remove(&self, key: &CacheKey) {
        self.entries.lock().shift_remove(key);
    }

    fn clear(&self) {
        self.entries.lock().clear();
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }

    fn evict_unused_since(&self, cutoff: Instant) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.last_used() >= cutoff);
        before - entries.len()
    }
}
