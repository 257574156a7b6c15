//! Generic TTL-expiring concurrent map backing all three cache ports.
//!
//! Built on [`DashMap`] for lock-free concurrent access, the same way the
//! teacher inode table serves concurrent FUSE lookups. Each entry additionally
//! carries an insertion timestamp so [`TtlMap::sweep`] can evict stale rows
//! without a background task owning the map.

use std::hash::Hash;
use std::time::{Duration, Instant};

use dashmap::DashMap;

struct Entry<V> {
    value: V,
    inserted_at: Instant,
}

/// A concurrent map where every entry expires `ttl` after insertion.
///
/// Expiry is checked lazily on `get` and eagerly on `sweep`; there is no
/// background eviction thread.
pub struct TtlMap<K, V> {
    inner: DashMap<K, Entry<V>>,
    ttl: Duration,
}

impl<K, V> TtlMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self { inner: DashMap::new(), ttl }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let entry = self.inner.get(key)?;
        if entry.inserted_at.elapsed() > self.ttl {
            drop(entry);
            self.inner.remove(key);
            return None;
        }
        Some(entry.value.clone())
    }

    pub fn put(&self, key: K, value: V) {
        self.inner.insert(
            key,
            Entry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn invalidate(&self, key: &K) {
        self.inner.remove(key);
    }

    /// Removes every entry whose TTL has elapsed; returns the count removed.
    pub fn sweep(&self) -> usize {
        let ttl = self.ttl;
        let stale: Vec<K> = self
            .inner
            .iter()
            .filter(|r| r.value().inserted_at.elapsed() > ttl)
            .map(|r| r.key().clone())
            .collect();

        for key in &stale {
            self.inner.remove(key);
        }
        stale.len()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
