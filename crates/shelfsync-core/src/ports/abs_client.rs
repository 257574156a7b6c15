//! Audiobookshelf REST client port (driven/secondary port)
//!
//! Implemented by `shelfsync-abs`. Decoded, near-wire shapes are returned;
//! normalization into [`crate::domain::Audiobook`] happens in the sync
//! orchestrator, not here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One ABS library.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbsLibrary {
    pub id: String,
    pub name: String,
}

/// Identifiers and descriptive metadata carried on an ABS library item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AbsItemMetadata {
    pub title: String,
    pub subtitle: Option<String>,
    pub author_name: String,
    pub narrators: Vec<String>,
    pub publisher: Option<String>,
    pub published_date: Option<String>,
    pub isbn: Option<String>,
    pub isbn_13: Option<String>,
    pub asin: Option<String>,
    pub language: Option<String>,
    pub genres: Vec<String>,
}

/// One entry from `GET /api/libraries/{id}/items`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbsLibraryItem {
    pub id: String,
    pub library_id: String,
    pub media_type: String,
    pub metadata: AbsItemMetadata,
    pub duration_seconds: f64,
    pub cover_url: Option<String>,
}

/// One entry of `GET /api/me`'s `mediaProgress`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbsMediaProgress {
    pub library_item_id: String,
    pub progress: f64,
    pub current_time_seconds: f64,
    pub duration_seconds: f64,
    pub is_finished: bool,
    pub finished_at: Option<DateTime<Utc>>,
}

/// One entry of `GET /api/me/listening-sessions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbsListeningSession {
    pub library_item_id: String,
    pub updated_at: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait IAbsClient: Send + Sync {
    async fn list_libraries(&self) -> anyhow::Result<Vec<AbsLibrary>>;

    async fn list_library_items(&self, library_id: &str) -> anyhow::Result<Vec<AbsLibraryItem>>;

    async fn get_media_progress(&self) -> anyhow::Result<Vec<AbsMediaProgress>>;

    /// Listening sessions updated since `since_ms`. Implementations must
    /// surface endpoint-unavailable as an `Err` so the orchestrator can fall
    /// back to a full sync rather than silently returning an empty list.
    async fn list_listening_sessions_since(
        &self,
        since_ms: i64,
    ) -> anyhow::Result<Vec<AbsListeningSession>>;
}
