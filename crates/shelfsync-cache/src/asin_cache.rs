//! In-memory cache for ASIN -> Hardcover book/edition lookups.

use std::time::Duration;

use shelfsync_core::ports::cache::{AsinLookup, IAsinCache};

use crate::ttl_map::TtlMap;

/// TTL for ASIN lookups. Long-lived since a given ASIN's book/edition
/// mapping on Hardcover essentially never changes.
const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

pub struct InMemoryAsinCache {
    map: TtlMap<String, AsinLookup>,
}

impl InMemoryAsinCache {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self { map: TtlMap::new(ttl) }
    }
}

impl Default for InMemoryAsinCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl IAsinCache for InMemoryAsinCache {
    async fn get(&self, asin: &str) -> Option<AsinLookup> {
        self.map.get(&asin.to_string())
    }

    async fn put(&self, asin: &str, value: AsinLookup) {
        self.map.put(asin.to_string(), value);
    }

    async fn invalidate(&self, asin: &str) {
        self.map.invalidate(&asin.to_string());
    }

    async fn sweep(&self) -> usize {
        self.map.sweep()
    }
}
