//! Cache port (driven/secondary port)
//!
//! Three logical caches share the same narrow shape: `get`/`put`/`invalidate`/
//! `sweep`. They are kept as separate traits rather than one generic trait
//! because `async_trait` objects must be dyn-safe, and each cache's key/value
//! pair is fixed by the domain (ASIN lookups, edition records, user-book
//! snapshots) rather than a free type parameter.

use crate::domain::{BookId, EditionId, EditionRecord, ProfileId, UserBookState};

/// Outcome of an ASIN lookup, including a cached negative result so repeated
/// lookups of a truly-missing ASIN don't re-hit HC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsinLookup {
    Found { book_id: BookId, edition_id: Option<EditionId> },
    NotFound,
}

#[async_trait::async_trait]
pub trait IAsinCache: Send + Sync {
    async fn get(&self, asin: &str) -> Option<AsinLookup>;
    async fn put(&self, asin: &str, value: AsinLookup);
    async fn invalidate(&self, asin: &str);
    /// Evicts all expired entries; returns the number removed.
    async fn sweep(&self) -> usize;
}

#[async_trait::async_trait]
pub trait IEditionCache: Send + Sync {
    async fn get(&self, edition_id: EditionId) -> Option<EditionRecord>;
    async fn put(&self, edition_id: EditionId, value: EditionRecord);
    async fn invalidate(&self, edition_id: EditionId);
    async fn sweep(&self) -> usize;
}

#[async_trait::async_trait]
pub trait IUserBookCache: Send + Sync {
    async fn get(&self, profile_id: &ProfileId, book_id: BookId) -> Option<UserBookState>;
    async fn put(&self, profile_id: &ProfileId, book_id: BookId, value: UserBookState);
    async fn invalidate(&self, profile_id: &ProfileId, book_id: BookId);
    async fn sweep(&self) -> usize;
}
