//! In-memory cache for per-profile Hardcover user_book snapshots.

use std::time::Duration;

use shelfsync_core::domain::{BookId, ProfileId, UserBookState};
use shelfsync_core::ports::cache::IUserBookCache;

use crate::ttl_map::TtlMap;

/// Shorter-lived than the ASIN/edition caches: a user_book's progress and
/// status change every time ABS reports new listening activity.
const DEFAULT_TTL: Duration = Duration::from_secs(6 * 60 * 60);

type Key = (ProfileId, BookId);

pub struct InMemoryUserBookCache {
    map: TtlMap<Key, UserBookState>,
}

impl InMemoryUserBookCache {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self { map: TtlMap::new(ttl) }
    }
}

impl Default for InMemoryUserBookCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl IUserBookCache for InMemoryUserBookCache {
    async fn get(&self, profile_id: &ProfileId, book_id: BookId) -> Option<UserBookState> {
        self.map.get(&(profile_id.clone(), book_id))
    }

    async fn put(&self, profile_id: &ProfileId, book_id: BookId, value: UserBookState) {
        self.map.put((profile_id.clone(), book_id), value);
    }

    async fn invalidate(&self, profile_id: &ProfileId, book_id: BookId) {
        self.map.invalidate(&(profile_id.clone(), book_id));
    }

    async fn sweep(&self) -> usize {
        self.map.sweep()
    }
}
