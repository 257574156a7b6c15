//! Hardcover GraphQL client port (driven/secondary port)
//!
//! Implemented by `shelfsync-hardcover`. Every method is rate-limited and
//! retried by the adapter; this trait only describes the decoded shape the
//! engine needs.

use chrono::NaiveDate;

use crate::domain::{BookId, EditionId, EditionRecord, ReadRecord, ReadingStatus, UserBookId, UserBookState};

/// Result of a book lookup: the canonical book id, and an audiobook edition
/// id when one could be resolved in the same query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookMatch {
    pub book_id: BookId,
    pub edition_id: Option<EditionId>,
}

/// Fields needed to create a new `user_book` row.
#[derive(Debug, Clone)]
pub struct NewUserBook {
    pub book_id: BookId,
    pub edition_id: Option<EditionId>,
    pub status: ReadingStatus,
    pub owned: bool,
}

/// Fields needed to create a new `user_book_read` row.
#[derive(Debug, Clone)]
pub struct NewRead {
    pub progress_seconds: i64,
    pub started_at: NaiveDate,
    pub finished_at: Option<NaiveDate>,
    pub edition_id: Option<EditionId>,
    pub reading_format_id: i32,
}

#[async_trait::async_trait]
pub trait IHardcoverClient: Send + Sync {
    /// Returns the authenticated user's username, used to scope all
    /// `user_books` queries and avoid cross-user leakage.
    async fn current_username(&self) -> anyhow::Result<String>;

    /// Looks up a book + audiobook edition by ASIN. Follows `canonical_id`
    /// transparently when the result is a deduped book.
    async fn find_by_asin(&self, asin: &str) -> anyhow::Result<Option<BookMatch>>;

    async fn find_by_isbn13(&self, isbn13: &str) -> anyhow::Result<Option<BookMatch>>;

    async fn find_by_isbn10(&self, isbn10: &str) -> anyhow::Result<Option<BookMatch>>;

    /// Title + author fallback lookup. `title` should already be
    /// normalized by the caller (trailing "(Unabridged)" etc. stripped).
    async fn find_by_title_author(
        &self,
        title: &str,
        author: &str,
    ) -> anyhow::Result<Option<BookMatch>>;

    /// Fetches the current `user_book` snapshot for `(username, book_id)`,
    /// including every read's full field set.
    async fn get_user_book(
        &self,
        username: &str,
        book_id: BookId,
    ) -> anyhow::Result<Option<UserBookState>>;

    /// Fetches the full field set of a specific read, used when the
    /// primary filter misses and a fallback query to the most recent read
    /// is required before merging new progress.
    async fn get_read(&self, user_book_id: UserBookId, read_id: crate::domain::ReadRecordId) -> anyhow::Result<Option<ReadRecord>>;

    async fn fetch_edition(&self, edition_id: EditionId) -> anyhow::Result<Option<EditionRecord>>;

    async fn insert_user_book(&self, new_user_book: NewUserBook) -> anyhow::Result<UserBookId>;

    async fn update_user_book_status(
        &self,
        user_book_id: UserBookId,
        status: ReadingStatus,
    ) -> anyhow::Result<()>;

    async fn insert_user_book_read(
        &self,
        user_book_id: UserBookId,
        new_read: NewRead,
    ) -> anyhow::Result<crate::domain::ReadRecordId>;

    /// Resends the full field set of an existing read with a new progress
    /// value merged in. Callers must supply every previously-set field;
    /// omitted fields become NULL on the HC side.
    async fn update_user_book_read(
        &self,
        read_id: crate::domain::ReadRecordId,
        read: &ReadRecord,
    ) -> anyhow::Result<()>;

    async fn mark_edition_owned(&self, edition_id: EditionId) -> anyhow::Result<()>;
}
