//! Audiobookshelf REST API client
//!
//! ## Usage
//!
//! ```rust,no_run
//! use shelfsync_abs::client::AbsClient;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = AbsClient::new("https://abs.example.com", "abs-token-here");
//! let libraries = client.list_libraries_raw().await?;
//! # Ok(())
//! # }
//! ```

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, warn};

use shelfsync_core::ports::abs_client::{
    AbsItemMetadata, AbsLibrary, AbsLibraryItem, AbsListeningSession, AbsMediaProgress, IAbsClient,
};
use shelfsync_ratelimit::{parse_retry_after, AdaptiveRateLimiter};

const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(10);
const DEFAULT_MAX_RETRIES: u32 = 5;
const RATE_LIMIT_BUCKET: &str = "abs";

#[derive(Debug, Deserialize)]
struct LibrariesResponse {
    libraries: Vec<LibraryWire>,
}

#[derive(Debug, Deserialize)]
struct LibraryWire {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct LibraryItemsResponse {
    results: Vec<LibraryItemWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LibraryItemWire {
    id: String,
    library_id: String,
    media_type: String,
    media: MediaWire,
}

#[derive(Debug, Deserialize)]
struct MediaWire {
    metadata: MetadataWire,
    #[serde(default)]
    duration: f64,
    #[serde(rename = "coverPath")]
    cover_path: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct MetadataWire {
    title: String,
    subtitle: Option<String>,
    #[serde(default)]
    author_name: String,
    #[serde(default)]
    narrators: Vec<String>,
    publisher: Option<String>,
    published_date: Option<String>,
    isbn: Option<String>,
    #[serde(default)]
    isbn_13: Option<String>,
    asin: Option<String>,
    language: Option<String>,
    #[serde(default)]
    genres: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MeResponse {
    #[serde(default)]
    media_progress: Vec<MediaProgressWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MediaProgressWire {
    library_item_id: String,
    #[serde(default)]
    progress: f64,
    #[serde(default)]
    current_time: f64,
    #[serde(default)]
    duration: f64,
    #[serde(default)]
    is_finished: bool,
    finished_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ListeningSessionsResponse {
    sessions: Vec<ListeningSessionWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListeningSessionWire {
    library_item_id: String,
    updated_at: i64,
}

/// HTTP client for the Audiobookshelf REST API.
///
/// Wraps `reqwest::Client` with bearer-auth headers and base-URL
/// construction. Optionally integrates with an [`AdaptiveRateLimiter`].
pub struct AbsClient {
    client: Client,
    base_url: String,
    access_token: String,
    rate_limiter: Option<Arc<AdaptiveRateLimiter>>,
}

impl AbsClient {
    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            access_token: access_token.into(),
            rate_limiter: None,
        }
    }

    pub fn with_rate_limiter(mut self, limiter: Arc<AdaptiveRateLimiter>) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    pub fn set_rate_limiter(&mut self, limiter: Arc<AdaptiveRateLimiter>) {
        self.rate_limiter = Some(limiter);
        debug!("rate limiter attached to AbsClient");
    }

    pub fn rate_limiter(&self) -> Option<&Arc<AdaptiveRateLimiter>> {
        self.rate_limiter.as_ref()
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client.request(method, url).bearer_auth(&self.access_token)
    }

    /// Sends a GET request with proactive rate limiting and automatic 429
    /// retry, deserializing the JSON body into `T`.
    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let max_retries = self
            .rate_limiter
            .as_ref()
            .map(|rl| rl.max_retries())
            .unwrap_or(DEFAULT_MAX_RETRIES);

        for attempt in 0..=max_retries {
            if let Some(ref limiter) = self.rate_limiter {
                let _guard = limiter.acquire(RATE_LIMIT_BUCKET).await;
            }

            let response = self
                .request(Method::GET, path)
                .send()
                .await
                .with_context(|| format!("failed to send GET {path}"))?;

            if response.status() == StatusCode::TOO_MANY_REQUESTS {
                if attempt >= max_retries {
                    warn!(path, attempts = attempt + 1, "ABS 429 retry limit exhausted");
                    anyhow::bail!("Audiobookshelf rate limit exceeded after {} attempts for {path}", attempt + 1);
                }

                let retry_after = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .map(|v| parse_retry_after(v, DEFAULT_RETRY_AFTER))
                    .unwrap_or(DEFAULT_RETRY_AFTER);

                if let Some(ref limiter) = self.rate_limiter {
                    limiter.on_throttle(RATE_LIMIT_BUCKET);
                }

                info!(path, attempt, retry_after_ms = retry_after.as_millis(), "ABS 429, backing off");
                tokio::time::sleep(retry_after).await;
                continue;
            }

            if response.status() == StatusCode::NOT_FOUND {
                anyhow::bail!("Audiobookshelf endpoint not found: {path}");
            }

            let response = response
                .error_for_status()
                .with_context(|| format!("GET {path} returned error status"))?;

            let body: T = response
                .json()
                .await
                .with_context(|| format!("failed to parse response body for {path}"))?;

            if let Some(ref limiter) = self.rate_limiter {
                limiter.on_success(RATE_LIMIT_BUCKET);
            }

            return Ok(body);
        }

        anyhow::bail!("Audiobookshelf request failed: retry loop exited unexpectedly for {path}")
    }

    pub async fn list_libraries_raw(&self) -> Result<Vec<AbsLibrary>> {
        let resp: LibrariesResponse = self.get_json("/api/libraries").await?;
        Ok(resp
            .libraries
            .into_iter()
            .map(|l| AbsLibrary { id: l.id, name: l.name })
            .collect())
    }
}

fn epoch_ms_to_datetime(ms: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
}

#[async_trait::async_trait]
impl IAbsClient for AbsClient {
    async fn list_libraries(&self) -> Result<Vec<AbsLibrary>> {
        self.list_libraries_raw().await
    }

    async fn list_library_items(&self, library_id: &str) -> Result<Vec<AbsLibraryItem>> {
        let path = format!("/api/libraries/{library_id}/items?expanded=1");
        let resp: LibraryItemsResponse = self.get_json(&path).await?;

        Ok(resp
            .results
            .into_iter()
            .map(|item| AbsLibraryItem {
                id: item.id,
                library_id: item.library_id,
                media_type: item.media_type,
                cover_url: item.media.cover_path.clone(),
                duration_seconds: item.media.duration,
                metadata: AbsItemMetadata {
                    title: item.media.metadata.title,
                    subtitle: item.media.metadata.subtitle,
                    author_name: item.media.metadata.author_name,
                    narrators: item.media.metadata.narrators,
                    publisher: item.media.metadata.publisher,
                    published_date: item.media.metadata.published_date,
                    isbn: item.media.metadata.isbn,
                    isbn_13: item.media.metadata.isbn_13,
                    asin: item.media.metadata.asin,
                    language: item.media.metadata.language,
                    genres: item.media.metadata.genres,
                },
            })
            .collect())
    }

    async fn get_media_progress(&self) -> Result<Vec<AbsMediaProgress>> {
        let resp: MeResponse = self.get_json("/api/me").await?;

        Ok(resp
            .media_progress
            .into_iter()
            .map(|p| AbsMediaProgress {
                library_item_id: p.library_item_id,
                progress: p.progress,
                current_time_seconds: p.current_time,
                duration_seconds: p.duration,
                is_finished: p.is_finished,
                finished_at: p.finished_at.and_then(epoch_ms_to_datetime),
            })
            .collect())
    }

    async fn list_listening_sessions_since(&self, since_ms: i64) -> Result<Vec<AbsListeningSession>> {
        let path = format!("/api/me/listening-sessions?itemsPerPage=1000&updatedAfter={since_ms}");
        let resp: ListeningSessionsResponse = self.get_json(&path).await.map_err(|e| {
            anyhow::anyhow!("listening-sessions endpoint unavailable, caller should fall back to full sync: {e}")
        })?;

        Ok(resp
            .sessions
            .into_iter()
            .filter_map(|s| {
                epoch_ms_to_datetime(s.updated_at).map(|updated_at| AbsListeningSession {
                    library_item_id: s.library_item_id,
                    updated_at,
                })
            })
            .collect())
    }
}
