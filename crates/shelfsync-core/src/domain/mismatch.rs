//! Mismatch records and their serialized `EditionCreationPayload` form.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::BookId;

/// Known publisher whose editions get a dedicated `edition_format`.
const LIBRO_FM_PUBLISHER_MARKER: &str = "libro.fm";

/// An unmatched, or incompletely matched, ABS item surfaced for manual
/// edition creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mismatch {
    pub title: String,
    pub subtitle: Option<String>,
    pub authors: Vec<String>,
    pub narrators: Vec<String>,
    pub publisher: Option<String>,
    pub published_date: Option<String>,
    pub duration_seconds: Option<i64>,
    pub isbn10: Option<String>,
    pub isbn13: Option<String>,
    pub asin: Option<String>,
    pub book_id: Option<BookId>,
    pub edition_id: Option<i64>,
    pub audiobookshelf_id: String,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
    pub cover_url: Option<String>,
}

impl Mismatch {
    /// Replaces any character outside `[A-Za-z0-9._-]` with `_`, for use in
    /// the mismatch filename.
    pub fn sanitize_title(title: &str) -> String {
        title
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }

    /// Derives the `edition_format` default: Audible Audio when an ASIN is
    /// present, libro.fm for that specific publisher, else empty.
    fn default_edition_format(&self) -> String {
        if self.asin.is_some() {
            "Audible Audio".to_string()
        } else if self
            .publisher
            .as_deref()
            .map(|p| p.to_lowercase().contains(LIBRO_FM_PUBLISHER_MARKER))
            .unwrap_or(false)
        {
            "libro.fm".to_string()
        } else {
            String::new()
        }
    }

    pub fn into_edition_creation_payload(self) -> EditionCreationPayload {
        let edition_format = self.default_edition_format();
        EditionCreationPayload {
            book_id: self.book_id.map(|id| id.value()).unwrap_or(0),
            title: self.title,
            subtitle: self.subtitle.unwrap_or_default(),
            image_url: self.cover_url.unwrap_or_default(),
            asin: self.asin.unwrap_or_default(),
            isbn_10: self.isbn10.unwrap_or_default(),
            isbn_13: self.isbn13.unwrap_or_default(),
            author_ids: Vec::new(),
            narrator_ids: Vec::new(),
            publisher_id: None,
            release_date: self
                .published_date
                .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok())
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            audio_seconds: self.duration_seconds.unwrap_or(0),
            edition_format,
            edition_information: String::new(),
            language_id: None,
            country_id: None,
        }
    }
}

/// Payload shape consumed by the (out-of-scope) external edition-creation
/// tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditionCreationPayload {
    pub book_id: i64,
    pub title: String,
    pub subtitle: String,
    pub image_url: String,
    pub asin: String,
    pub isbn_10: String,
    pub isbn_13: String,
    pub author_ids: Vec<i64>,
    pub narrator_ids: Vec<i64>,
    pub publisher_id: Option<i64>,
    pub release_date: String,
    pub audio_seconds: i64,
    pub edition_format: String,
    pub edition_information: String,
    pub language_id: Option<i64>,
    pub country_id: Option<i64>,
}
