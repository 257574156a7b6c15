//! Normalized in-memory view of one ABS library item.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// Metadata carried only for mismatch records; never used for matching
/// decisions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AudiobookMetadata {
    pub subtitle: Option<String>,
    pub narrators: Vec<String>,
    pub publisher: Option<String>,
    pub published_date: Option<String>,
    pub duration_seconds: Option<f64>,
    pub language: Option<String>,
    pub genres: Vec<String>,
    pub cover_url: Option<String>,
}

/// One ABS library item, normalized from whichever endpoint supplied the
/// strongest progress evidence (`GET /api/me` primary, listening-sessions
/// incremental).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Audiobook {
    id: String,
    library_id: String,
    title: String,
    author: String,
    isbn13: Option<String>,
    isbn10: Option<String>,
    asin: Option<String>,
    progress: f64,
    current_time_seconds: f64,
    total_duration_seconds: f64,
    is_finished: bool,
    finished_at: Option<NaiveDate>,
    metadata: AudiobookMetadata,
}

impl Audiobook {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        library_id: impl Into<String>,
        title: impl Into<String>,
        author: impl Into<String>,
        progress: f64,
        current_time_seconds: f64,
        total_duration_seconds: f64,
        is_finished: bool,
    ) -> Result<Self, DomainError> {
        if !(0.0..=1.0).contains(&progress) {
            return Err(DomainError::InvalidProgress(progress));
        }
        Ok(Self {
            id: id.into(),
            library_id: library_id.into(),
            title: title.into(),
            author: author.into(),
            isbn13: None,
            isbn10: None,
            asin: None,
            progress,
            current_time_seconds,
            total_duration_seconds,
            is_finished,
            finished_at: None,
            metadata: AudiobookMetadata::default(),
        })
    }

    /// Sets the date ABS reported this item as finished, when known.
    pub fn with_finished_at(mut self, finished_at: Option<NaiveDate>) -> Self {
        self.finished_at = finished_at;
        self
    }

    pub fn with_identifiers(
        mut self,
        asin: Option<String>,
        isbn13: Option<String>,
        isbn10: Option<String>,
    ) -> Self {
        self.asin = asin;
        self.isbn13 = isbn13;
        self.isbn10 = isbn10;
        self
    }

    pub fn with_metadata(mut self, metadata: AudiobookMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn library_id(&self) -> &str {
        &self.library_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn asin(&self) -> Option<&str> {
        self.asin.as_deref()
    }

    pub fn isbn13(&self) -> Option<&str> {
        self.isbn13.as_deref()
    }

    pub fn isbn10(&self) -> Option<&str> {
        self.isbn10.as_deref()
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn current_time_seconds(&self) -> f64 {
        self.current_time_seconds
    }

    pub fn total_duration_seconds(&self) -> f64 {
        self.total_duration_seconds
    }

    pub fn is_finished(&self) -> bool {
        self.is_finished
    }

    pub fn finished_at(&self) -> Option<NaiveDate> {
        self.finished_at
    }

    pub fn metadata(&self) -> &AudiobookMetadata {
        &self.metadata
    }

    /// Whether the stored progress meets the finished threshold used
    /// throughout the engine: `progress >= 0.99` counts as finished,
    /// `0.989999` does not.
    pub fn progress_counts_as_finished(&self) -> bool {
        self.progress >= 0.99 || self.is_finished
    }
}
