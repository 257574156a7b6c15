//! Snapshot of a Hardcover `user_book` row, as seen by the engine.

use serde::{Deserialize, Serialize};

use super::newtypes::{BookId, EditionId, ReadRecordId, UserBookId};

/// Reading status on the HC side. The numeric values are HC's own
/// `status_id` enumeration and must not be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum ReadingStatus {
    WantToRead = 1,
    CurrentlyReading = 2,
    Read = 3,
}

impl ReadingStatus {
    pub fn from_status_id(id: i32) -> Option<Self> {
        match id {
            1 => Some(Self::WantToRead),
            2 => Some(Self::CurrentlyReading),
            3 => Some(Self::Read),
            _ => None,
        }
    }

    pub fn status_id(&self) -> i32 {
        *self as i32
    }
}

/// The engine's working snapshot of a user's relationship to one HC book.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserBookState {
    user_book_id: UserBookId,
    book_id: BookId,
    status: ReadingStatus,
    progress_seconds: i64,
    owned: bool,
    edition_id: Option<EditionId>,
    has_finished_read: bool,
    latest_unfinished_read_id: Option<ReadRecordId>,
}

impl UserBookState {
    pub fn new(
        user_book_id: UserBookId,
        book_id: BookId,
        status: ReadingStatus,
        progress_seconds: i64,
        owned: bool,
    ) -> Self {
        Self {
            user_book_id,
            book_id,
            status,
            progress_seconds,
            owned,
            edition_id: None,
            has_finished_read: false,
            latest_unfinished_read_id: None,
        }
    }

    pub fn with_edition(mut self, edition_id: Option<EditionId>) -> Self {
        self.edition_id = edition_id;
        self
    }

    pub fn with_read_history(
        mut self,
        has_finished_read: bool,
        latest_unfinished_read_id: Option<ReadRecordId>,
    ) -> Self {
        self.has_finished_read = has_finished_read;
        self.latest_unfinished_read_id = latest_unfinished_read_id;
        self
    }

    pub fn user_book_id(&self) -> UserBookId {
        self.user_book_id
    }

    pub fn book_id(&self) -> BookId {
        self.book_id
    }

    pub fn status(&self) -> ReadingStatus {
        self.status
    }

    pub fn progress_seconds(&self) -> i64 {
        self.progress_seconds
    }

    pub fn owned(&self) -> bool {
        self.owned
    }

    pub fn edition_id(&self) -> Option<EditionId> {
        self.edition_id
    }

    pub fn has_finished_read(&self) -> bool {
        self.has_finished_read
    }

    pub fn latest_unfinished_read_id(&self) -> Option<ReadRecordId> {
        self.latest_unfinished_read_id
    }

    /// A genuine re-read: the book already has a finished read, but ABS now
    /// reports partial, non-zero progress. This must append a new read
    /// rather than touch the finished one.
    pub fn is_reread(&self, target_progress: f64) -> bool {
        self.has_finished_read && target_progress > 0.0 && target_progress < 0.99
    }
}
