//! In-memory cache for Hardcover edition records, keyed by edition id.

use std::time::Duration;

use shelfsync_core::domain::EditionId;
use shelfsync_core::domain::EditionRecord;
use shelfsync_core::ports::cache::IEditionCache;

use crate::ttl_map::TtlMap;

/// Editions change rarely; a week-long TTL keeps HC traffic low without
/// risking stale narrator/publisher metadata for long.
const DEFAULT_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

pub struct InMemoryEditionCache {
    map: TtlMap<EditionId, EditionRecord>,
}

impl InMemoryEditionCache {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self { map: TtlMap::new(ttl) }
    }
}

impl Default for InMemoryEditionCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl IEditionCache for InMemoryEditionCache {
    async fn get(&self, edition_id: EditionId) -> Option<EditionRecord> {
        self.map.get(&edition_id)
    }

    async fn put(&self, edition_id: EditionId, value: EditionRecord) {
        self.map.put(edition_id, value);
    }

    async fn invalidate(&self, edition_id: EditionId) {
        self.map.invalidate(&edition_id);
    }

    async fn sweep(&self) -> usize {
        self.map.sweep()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelfsync_core::domain::BookId;

    #[tokio::test]
    async fn caches_and_retrieves_an_edition() {
        let cache = InMemoryEditionCache::new();
        let edition_id = EditionId::new(77);
        let record = EditionRecord::new(edition_id, BookId::new(42), 2);

        cache.put(edition_id, record.clone()).await;
        let retrieved = cache.get(edition_id).await.expect("edition should be cached");
        assert_eq!(retrieved.book_id(), record.book_id());
    }

    #[tokio::test]
    async fn invalidate_removes_the_edition() {
        let cache = InMemoryEditionCache::new();
        let edition_id = EditionId::new(1);
        cache.put(edition_id, EditionRecord::new(edition_id, BookId::new(1), 2)).await;

        cache.invalidate(edition_id).await;
        assert!(cache.get(edition_id).await.is_none());
    }

    #[tokio::test]
    async fn distinct_editions_are_independent() {
        let cache = InMemoryEditionCache::new();
        let e1 = EditionId::new(1);
        let e2 = EditionId::new(2);
        cache.put(e1, EditionRecord::new(e1, BookId::new(10), 2)).await;

        assert!(cache.get(e1).await.is_some());
        assert!(cache.get(e2).await.is_none());
    }
}
