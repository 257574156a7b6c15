//! A Hardcover edition record, as cached by the engine.

use serde::{Deserialize, Serialize};

use super::newtypes::{BookId, EditionId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditionRecord {
    id: EditionId,
    book_id: BookId,
    asin: Option<String>,
    isbn10: Option<String>,
    isbn13: Option<String>,
    audio_seconds: Option<i64>,
    publisher_id: Option<i64>,
    reading_format_id: i32,
}

impl EditionRecord {
    pub fn new(id: EditionId, book_id: BookId, reading_format_id: i32) -> Self {
        Self {
            id,
            book_id,
            asin: None,
            isbn10: None,
            isbn13: None,
            audio_seconds: None,
            publisher_id: None,
            reading_format_id,
        }
    }

    pub fn with_identifiers(
        mut self,
        asin: Option<String>,
        isbn10: Option<String>,
        isbn13: Option<String>,
    ) -> Self {
        self.asin = asin;
        self.isbn10 = isbn10;
        self.isbn13 = isbn13;
        self
    }

    pub fn with_audio_seconds(mut self, audio_seconds: Option<i64>) -> Self {
        self.audio_seconds = audio_seconds;
        self
    }

    pub fn with_publisher_id(mut self, publisher_id: Option<i64>) -> Self {
        self.publisher_id = publisher_id;
        self
    }

    pub fn id(&self) -> EditionId {
        self.id
    }

    pub fn book_id(&self) -> BookId {
        self.book_id
    }

    pub fn asin(&self) -> Option<&str> {
        self.asin.as_deref()
    }

    pub fn isbn10(&self) -> Option<&str> {
        self.isbn10.as_deref()
    }

    pub fn isbn13(&self) -> Option<&str> {
        self.isbn13.as_deref()
    }

    pub fn audio_seconds(&self) -> Option<i64> {
        self.audio_seconds
    }

    pub fn publisher_id(&self) -> Option<i64> {
        self.publisher_id
    }

    pub fn reading_format_id(&self) -> i32 {
        self.reading_format_id
    }

    /// Whether this edition is an audiobook per HC's `reading_format_id`
    /// convention (2 = audiobook).
    pub fn is_audiobook(&self) -> bool {
        self.reading_format_id == 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_audiobook_checks_reading_format() {
        let e = EditionRecord::new(EditionId::new(500), BookId::new(100), 2);
        assert!(e.is_audiobook());

        let print = EditionRecord::new(EditionId::new(501), BookId::new(100), 1);
        assert!(!print.is_audiobook());
    }

    #[test]
    fn identifiers_default_to_none() {
        let e = EditionRecord::new(EditionId::new(1), BookId::new(1), 2);
        assert_eq!(e.asin(), None);
        assert_eq!(e.isbn10(), None);
    }
}
