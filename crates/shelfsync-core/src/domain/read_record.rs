//! A Hardcover `user_book_read` row.
//!
//! The update mutation on the HC side NULLs any field not re-supplied, so
//! every previously-set field carried by a [`ReadRecord`] must survive an
//! update unless the engine explicitly means to change it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::newtypes::{EditionId, ReadRecordId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadRecord {
    id: ReadRecordId,
    progress_seconds: i64,
    started_at: NaiveDate,
    finished_at: Option<NaiveDate>,
    edition_id: Option<EditionId>,
    reading_format_id: Option<i32>,
}

/// HC's `reading_format_id` for audiobook reads.
pub const AUDIOBOOK_READING_FORMAT_ID: i32 = 2;

impl ReadRecord {
    pub fn new(id: ReadRecordId, progress_seconds: i64, started_at: NaiveDate) -> Self {
        Self {
            id,
            progress_seconds,
            started_at,
            finished_at: None,
            edition_id: None,
            reading_format_id: Some(AUDIOBOOK_READING_FORMAT_ID),
        }
    }

    pub fn with_finished_at(mut self, finished_at: Option<NaiveDate>) -> Self {
        self.finished_at = finished_at;
        self
    }

    pub fn with_edition(mut self, edition_id: Option<EditionId>) -> Self {
        self.edition_id = edition_id;
        self
    }

    pub fn id(&self) -> ReadRecordId {
        self.id
    }

    pub fn progress_seconds(&self) -> i64 {
        self.progress_seconds
    }

    pub fn started_at(&self) -> NaiveDate {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<NaiveDate> {
        self.finished_at
    }

    pub fn edition_id(&self) -> Option<EditionId> {
        self.edition_id
    }

    pub fn reading_format_id(&self) -> Option<i32> {
        self.reading_format_id
    }

    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }

    /// Returns a copy with `progress_seconds` replaced, every other
    /// previously-set field carried forward verbatim. This is the shape an
    /// `update_user_book_read` mutation body must be built from.
    pub fn merged_with_new_progress(&self, progress_seconds: i64) -> Self {
        Self {
            progress_seconds,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn merge_preserves_all_other_fields() {
        let original = ReadRecord::new(ReadRecordId::new(42), 3600, date(2025, 1, 1))
            .with_edition(Some(EditionId::new(500)));

        let updated = original.merged_with_new_progress(5400);

        assert_eq!(updated.progress_seconds(), 5400);
        assert_eq!(updated.started_at(), date(2025, 1, 1));
        assert_eq!(updated.edition_id(), Some(EditionId::new(500)));
        assert_eq!(updated.reading_format_id(), Some(AUDIOBOOK_READING_FORMAT_ID));
        assert_eq!(updated.finished_at(), None);
    }

    #[test]
    fn is_finished_reflects_finished_at() {
        let r = ReadRecord::new(ReadRecordId::new(1), 100, date(2025, 1, 1));
        assert!(!r.is_finished());
        let r = r.with_finished_at(Some(date(2025, 1, 2)));
        assert!(r.is_finished());
    }
}
