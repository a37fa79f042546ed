//! Cursor-scoped scratch pool.
//!
//! Graph construction creates many transient per-node and per-element read
//! objects that are shared between faces. They live in a [`ScratchPool`]
//! only while one entity's graph is being built; a [`ScratchScope`] drains
//! the pool on every exit path so nothing leaks into the next entity.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use parking_lot::RwLock;

/// Key of a transient result object.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Debug)]
pub enum ScratchKey {
    Node(i32),
    Element(i32),
    ElementNode { element: i32, node: i32 },
}

/// Thread-safe memo of transient objects keyed by `K`.
///
/// Uses `parking_lot::RwLock` for non-poisoning locks and atomics for
/// lock-free statistics.
pub struct ScratchPool<K, V> {
    entries: RwLock<HashMap<K, V>>,
    hits: AtomicUsize,
    created: AtomicUsize,
}

impl<K: Hash + Eq + Copy, V: Clone> ScratchPool<K, V> {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            hits: AtomicUsize::new(0),
            created: AtomicUsize::new(0),
        }
    }

    /// Get a pooled entry if it exists.
    #[inline]
    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.read().get(key).cloned()
    }

    /// Get the entry for `key`, creating it with `make` on a miss.
    ///
    /// `make` returning `None` caches nothing, so the next lookup retries.
    pub fn get_or_try_insert(&self, key: K, make: impl FnOnce() -> Option<V>) -> Option<V> {
        if let Some(v) = self.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Some(v);
        }

        let value = make()?;
        let mut entries = self.entries.write();
        let entry = entries.entry(key).or_insert_with(|| {
            self.created.fetch_add(1, Ordering::Relaxed);
            value
        });
        Some(entry.clone())
    }

    /// Open a scope that drains the pool when dropped.
    pub fn scope(&self) -> ScratchScope<'_, K, V> {
        ScratchScope { pool: self }
    }

    /// Remove every entry and reset statistics.
    pub fn drain(&self) -> usize {
        let n = {
            let mut entries = self.entries.write();
            let n = entries.len();
            entries.clear();
            n
        };
        self.hits.store(0, Ordering::Relaxed);
        self.created.store(0, Ordering::Relaxed);
        n
    }

    /// Number of pooled entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if the pool is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of entries created since the last drain.
    #[inline]
    pub fn created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }

    /// Number of lookups served from the pool since the last drain.
    #[inline]
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }
}

impl<K: Hash + Eq + Copy, V: Clone> Default for ScratchPool<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard that drains its pool on drop.
pub struct ScratchScope<'a, K: Hash + Eq + Copy, V: Clone> {
    pool: &'a ScratchPool<K, V>,
}

impl<K: Hash + Eq + Copy, V: Clone> ScratchScope<'_, K, V> {
    /// The scoped pool.
    #[inline]
    pub fn pool(&self) -> &ScratchPool<K, V> {
        self.pool
    }
}

impl<K: Hash + Eq + Copy, V: Clone> Drop for ScratchScope<'_, K, V> {
    fn drop(&mut self) {
        self.pool.drain();
    }
}
