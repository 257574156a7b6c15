//! Hardcover GraphQL API client
//!
//! Hardcover exposes a single GraphQL-over-HTTPS endpoint that accepts a
//! `{query, variables}` body for both queries and mutations, authenticated
//! with a static bearer token (no OAuth dance, unlike a cloud-storage
//! provider's delegated-auth flow).
//!
//! ## Usage
//!
//! ```rust,no_run
//! use shelfsync_hardcover::client::HardcoverClient;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = HardcoverClient::new("hc-token-here");
//! let username = client.current_username_raw().await?;
//! println!("Hello, {}", username);
//! # Ok(())
//! # }
//! ```

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use shelfsync_core::domain::{
    BookId, EditionId, EditionRecord, ReadRecord, ReadRecordId, ReadingStatus, UserBookId, UserBookState,
};
use shelfsync_core::ports::hardcover_client::{BookMatch, IHardcoverClient, NewRead, NewUserBook};
use shelfsync_ratelimit::{parse_retry_after, AdaptiveRateLimiter};

/// Base URL for the Hardcover GraphQL API.
const HARDCOVER_BASE_URL: &str = "https://api.hardcover.app/v1/graphql";

/// Default retry-after duration when the header is missing.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(30);

/// Maximum retries for 429 responses when no rate limiter is configured.
const DEFAULT_MAX_RETRIES: u32 = 5;

/// Rate-limit bucket name all Hardcover calls share; Hardcover publishes a
/// single account-wide cap rather than per-endpoint ones.
const RATE_LIMIT_BUCKET: &str = "hardcover";

/// HTTP client for the Hardcover GraphQL API.
///
/// Wraps `reqwest::Client` with authentication headers and the GraphQL
/// request/response envelope. Optionally integrates with an
/// [`AdaptiveRateLimiter`] for proactive rate limiting and automatic 429
/// retry handling.
pub struct HardcoverClient {
    client: Client,
    base_url: String,
    access_token: String,
    rate_limiter: Option<Arc<AdaptiveRateLimiter>>,
}

impl HardcoverClient {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: HARDCOVER_BASE_URL.to_string(),
            access_token: access_token.into(),
            rate_limiter: None,
        }
    }

    /// Creates a client pointed at a custom base URL, for tests.
    pub fn with_base_url(access_token: impl Into<String>, base_url: impl Into<String>) -> Self {
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
        debug!("rate limiter attached to HardcoverClient");
    }

    pub fn rate_limiter(&self) -> Option<&Arc<AdaptiveRateLimiter>> {
        self.rate_limiter.as_ref()
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Executes a GraphQL query or mutation with proactive rate limiting
    /// and automatic 429 retry, returning the `data` field of the response.
    async fn execute_graphql(&self, query: &str, variables: Value) -> Result<Value> {
        let max_retries = self
            .rate_limiter
            .as_ref()
            .map(|rl| rl.max_retries())
            .unwrap_or(DEFAULT_MAX_RETRIES);

        let body = json!({ "query": query, "variables": variables });

        for attempt in 0..=max_retries {
            if let Some(ref limiter) = self.rate_limiter {
                let _guard = limiter.acquire(RATE_LIMIT_BUCKET).await;
            }

            let response = self
                .client
                .post(&self.base_url)
                .bearer_auth(&self.access_token)
                .json(&body)
                .send()
                .await
                .context("failed to send Hardcover GraphQL request")?;

            if response.status() == StatusCode::TOO_MANY_REQUESTS {
                if attempt >= max_retries {
                    warn!(attempts = attempt + 1, "Hardcover 429 retry limit exhausted");
                    anyhow::bail!("Hardcover rate limit exceeded after {} attempts", attempt + 1);
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

                info!(attempt, retry_after_ms = retry_after.as_millis(), "Hardcover 429, backing off");
                tokio::time::sleep(retry_after).await;
                continue;
            }

            let response = response.error_for_status().context("Hardcover returned an error status")?;

            let payload: Value = response.json().await.context("failed to parse Hardcover response as JSON")?;

            if let Some(errors) = payload.get("errors").filter(|e| !e.is_null()) {
                anyhow::bail!("Hardcover GraphQL errors: {errors}");
            }

            if let Some(ref limiter) = self.rate_limiter {
                limiter.on_success(RATE_LIMIT_BUCKET);
            }

            return Ok(payload.get("data").cloned().unwrap_or(Value::Null));
        }

        anyhow::bail!("Hardcover request failed: retry loop exited unexpectedly");
    }

    /// Non-trait helper used by doctest/examples; the trait method wraps it.
    pub async fn current_username_raw(&self) -> Result<String> {
        let data = self
            .execute_graphql("query { me { username } }", json!({}))
            .await?;

        data.get("me")
            .and_then(|m| m.as_array())
            .and_then(|arr| arr.first())
            .and_then(|m| m.get("username"))
            .and_then(|u| u.as_str())
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("Hardcover `me` response missing username"))
    }

    async fn find_by_identifier(&self, field: &str, value: &str) -> Result<Option<BookMatch>> {
        let query = format!(
            "query($value: String!) {{ editions(where: {{ {field}: {{ _eq: $value }}, reading_format_id: {{ _eq: 2 }} }}, limit: 1) \
             {{ id book_id reading_format_id book {{ id book_status_id canonical_id }} }} }}"
        );
        let data = self.execute_graphql(&query, json!({ "value": value })).await?;

        let edition = data.get("editions").and_then(|e| e.as_array()).and_then(|arr| arr.first());

        let Some(edition) = edition else { return Ok(None) };

        let book_id = edition
            .get("book_id")
            .and_then(Value::as_i64)
            .ok_or_else(|| anyhow::anyhow!("edition row missing book_id"))?;

        let edition_id = edition.get("id").and_then(Value::as_i64).map(EditionId::new);
        let book_id = follow_canonical_book_id(edition.get("book"), book_id);

        Ok(Some(BookMatch {
            book_id: BookId::new(book_id),
            edition_id,
        }))
    }
}

/// `book_status_id == 4` means the book was merged into another one; Hardcover
/// keeps the old row around for history but expects callers to operate on
/// `canonical_id` instead. Falls back to `book_id` whenever the canonical hop
/// is missing or malformed so this never turns into a hard match failure.
const DEDUPED_BOOK_STATUS_ID: i64 = 4;

fn follow_canonical_book_id(book: Option<&Value>, book_id: i64) -> i64 {
    let Some(book) = book else { return book_id };

    let status_id = book.get("book_status_id").and_then(Value::as_i64);
    if status_id != Some(DEDUPED_BOOK_STATUS_ID) {
        return book_id;
    }

    match book.get("canonical_id").and_then(Value::as_i64) {
        Some(canonical_id) => {
            debug!(book_id, canonical_id, "book is deduped, following canonical_id");
            canonical_id
        }
        None => {
            warn!(book_id, "book marked deduped but canonical_id missing, using original id");
            book_id
        }
    }
}

#[async_trait::async_trait]
impl IHardcoverClient for HardcoverClient {
    async fn current_username(&self) -> Result<String> {
        self.current_username_raw().await
    }

    async fn find_by_asin(&self, asin: &str) -> Result<Option<BookMatch>> {
        self.find_by_identifier("asin", asin).await
    }

    async fn find_by_isbn13(&self, isbn13: &str) -> Result<Option<BookMatch>> {
        self.find_by_identifier("isbn_13", isbn13).await
    }

    async fn find_by_isbn10(&self, isbn10: &str) -> Result<Option<BookMatch>> {
        self.find_by_identifier("isbn_10", isbn10).await
    }

    async fn find_by_title_author(&self, title: &str, author: &str) -> Result<Option<BookMatch>> {
        let query = r#"
            query($title: String!, $author: String!) {
                books(
                    where: {
                        title: { _ilike: $title }
                        contributions: { author: { name: { _ilike: $author } } }
                    }
                    limit: 1
                ) {
                    id
                    book_status_id
                    canonical_id
                    editions(where: { reading_format_id: { _eq: 2 } }, limit: 1) { id }
                }
            }
        "#;
        let data = self
            .execute_graphql(query, json!({ "title": title, "author": author }))
            .await?;

        let book = data.get("books").and_then(|b| b.as_array()).and_then(|arr| arr.first());
        let Some(book) = book else { return Ok(None) };

        let book_id = book
            .get("id")
            .and_then(Value::as_i64)
            .ok_or_else(|| anyhow::anyhow!("book row missing id"))?;
        let book_id = follow_canonical_book_id(Some(book), book_id);

        let edition_id = book
            .get("editions")
            .and_then(|e| e.as_array())
            .and_then(|arr| arr.first())
            .and_then(|e| e.get("id"))
            .and_then(Value::as_i64)
            .map(EditionId::new);

        Ok(Some(BookMatch {
            book_id: BookId::new(book_id),
            edition_id,
        }))
    }

    async fn get_user_book(&self, username: &str, book_id: BookId) -> Result<Option<UserBookState>> {
        let query = r#"
            query($username: String!, $book_id: Int!) {
                user_books(
                    where: { book_id: { _eq: $book_id }, user: { username: { _eq: $username } } }
                    limit: 1
                ) {
                    id
                    book_id
                    status_id
                    edition_id
                    owned
                    user_book_reads(order_by: { id: desc }) {
                        id
                        progress_seconds
                        finished_at
                    }
                }
            }
        "#;
        let data = self
            .execute_graphql(query, json!({ "username": username, "book_id": book_id.value() }))
            .await?;

        let row = data.get("user_books").and_then(|b| b.as_array()).and_then(|arr| arr.first());
        let Some(row) = row else { return Ok(None) };

        let user_book_id = row.get("id").and_then(Value::as_i64).map(UserBookId::new).unwrap_or(UserBookId::unknown());
        let status_id = row.get("status_id").and_then(Value::as_i64).unwrap_or(1) as i32;
        let status = ReadingStatus::from_status_id(status_id).unwrap_or(ReadingStatus::WantToRead);
        let edition_id = row.get("edition_id").and_then(Value::as_i64).map(EditionId::new);
        let owned = row.get("owned").and_then(Value::as_bool).unwrap_or(false);

        let reads = row.get("user_book_reads").and_then(|r| r.as_array()).cloned().unwrap_or_default();

        let has_finished_read = reads.iter().any(|r| r.get("finished_at").is_some_and(|f| !f.is_null()));

        let latest_unfinished = reads.iter().find(|r| r.get("finished_at").map_or(true, Value::is_null));

        let latest_unfinished_read_id = latest_unfinished
            .and_then(|r| r.get("id"))
            .and_then(Value::as_i64)
            .map(ReadRecordId::new);

        let progress_seconds = latest_unfinished
            .and_then(|r| r.get("progress_seconds"))
            .and_then(Value::as_i64)
            .unwrap_or(0);

        let state = UserBookState::new(user_book_id, book_id, status, progress_seconds, owned)
            .with_edition(edition_id)
            .with_read_history(has_finished_read, latest_unfinished_read_id);

        Ok(Some(state))
    }

    async fn get_read(&self, user_book_id: UserBookId, read_id: ReadRecordId) -> Result<Option<ReadRecord>> {
        let query = r#"
            query($read_id: Int!) {
                user_book_reads(where: { id: { _eq: $read_id } }, limit: 1) {
                    id
                    progress_seconds
                    started_at
                    finished_at
                    edition_id
                    reading_format_id
                }
            }
        "#;
        let data = self.execute_graphql(query, json!({ "read_id": read_id.value() })).await?;
        let row = data.get("user_book_reads").and_then(|r| r.as_array()).and_then(|arr| arr.first());

        if let Some(row) = row {
            return Ok(Some(read_record_from_row(row)?));
        }

        // The primary filter found nothing (the read may have been merged or
        // renumbered upstream); fall back to the most recent read for the
        // user_book so the caller still has a record to merge new progress
        // into instead of losing the update entirely.
        warn!(read_id = read_id.value(), "read not found by id, falling back to most recent read for user_book");
        let fallback_query = r#"
            query($user_book_id: Int!) {
                user_book_reads(where: { user_book_id: { _eq: $user_book_id } }, order_by: { id: desc }, limit: 1) {
                    id
                    progress_seconds
                    started_at
                    finished_at
                    edition_id
                    reading_format_id
                }
            }
        "#;
        let data = self
            .execute_graphql(fallback_query, json!({ "user_book_id": user_book_id.value() }))
            .await?;
        let row = data.get("user_book_reads").and_then(|r| r.as_array()).and_then(|arr| arr.first());
        let Some(row) = row else { return Ok(None) };

        Ok(Some(read_record_from_row(row)?))
    }

    async fn fetch_edition(&self, edition_id: EditionId) -> Result<Option<EditionRecord>> {
        let query = r#"
            query($edition_id: Int!) {
                editions(where: { id: { _eq: $edition_id } }, limit: 1) {
                    id
                    book_id
                    asin
                    isbn_10
                    isbn_13
                    audio_seconds
                    publisher_id
                    reading_format_id
                }
            }
        "#;
        let data = self.execute_graphql(query, json!({ "edition_id": edition_id.value() })).await?;
        let row = data.get("editions").and_then(|e| e.as_array()).and_then(|arr| arr.first());
        let Some(row) = row else { return Ok(None) };

        let book_id = row
            .get("book_id")
            .and_then(Value::as_i64)
            .ok_or_else(|| anyhow::anyhow!("edition row missing book_id"))?;
        let reading_format_id = row.get("reading_format_id").and_then(Value::as_i64).unwrap_or(0) as i32;

        let record = EditionRecord::new(edition_id, BookId::new(book_id), reading_format_id)
            .with_identifiers(
                as_opt_string(row, "asin"),
                as_opt_string(row, "isbn_10"),
                as_opt_string(row, "isbn_13"),
            )
            .with_audio_seconds(row.get("audio_seconds").and_then(Value::as_i64))
            .with_publisher_id(row.get("publisher_id").and_then(Value::as_i64));

        Ok(Some(record))
    }

    async fn insert_user_book(&self, new_user_book: NewUserBook) -> Result<UserBookId> {
        let mutation = r#"
            mutation($book_id: Int!, $edition_id: Int, $status_id: Int!, $owned: Boolean!) {
                insert_user_books(
                    objects: [{ book_id: $book_id, edition_id: $edition_id, status_id: $status_id, owned: $owned }]
                ) {
                    returning { id }
                }
            }
        "#;
        let variables = json!({
            "book_id": new_user_book.book_id.value(),
            "edition_id": new_user_book.edition_id.map(|e| e.value()),
            "status_id": new_user_book.status.status_id(),
            "owned": new_user_book.owned,
        });
        let data = self.execute_graphql(mutation, variables).await?;

        data.get("insert_user_books")
            .and_then(|r| r.get("returning"))
            .and_then(|r| r.as_array())
            .and_then(|arr| arr.first())
            .and_then(|row| row.get("id"))
            .and_then(Value::as_i64)
            .map(UserBookId::new)
            .ok_or_else(|| anyhow::anyhow!("insert_user_books did not return an id"))
    }

    async fn update_user_book_status(&self, user_book_id: UserBookId, status: ReadingStatus) -> Result<()> {
        let mutation = r#"
            mutation($id: Int!, $status_id: Int!) {
                update_user_books(where: { id: { _eq: $id } }, _set: { status_id: $status_id }) {
                    affected_rows
                }
            }
        "#;
        self.execute_graphql(
            mutation,
            json!({ "id": user_book_id.value(), "status_id": status.status_id() }),
        )
        .await?;
        Ok(())
    }

    async fn insert_user_book_read(&self, user_book_id: UserBookId, new_read: NewRead) -> Result<ReadRecordId> {
        let mutation = r#"
            mutation(
                $user_book_id: Int!
                $progress_seconds: Int!
                $started_at: date!
                $finished_at: date
                $edition_id: Int
                $reading_format_id: Int
            ) {
                insert_user_book_reads(
                    objects: [{
                        user_book_id: $user_book_id
                        progress_seconds: $progress_seconds
                        started_at: $started_at
                        finished_at: $finished_at
                        edition_id: $edition_id
                        reading_format_id: $reading_format_id
                    }]
                ) {
                    returning { id }
                }
            }
        "#;
        let variables = json!({
            "user_book_id": user_book_id.value(),
            "progress_seconds": new_read.progress_seconds,
            "started_at": new_read.started_at.to_string(),
            "finished_at": new_read.finished_at.map(|d| d.to_string()),
            "edition_id": new_read.edition_id.map(|e| e.value()),
            "reading_format_id": new_read.reading_format_id,
        });
        let data = self.execute_graphql(mutation, variables).await?;

        data.get("insert_user_book_reads")
            .and_then(|r| r.get("returning"))
            .and_then(|r| r.as_array())
            .and_then(|arr| arr.first())
            .and_then(|row| row.get("id"))
            .and_then(Value::as_i64)
            .map(ReadRecordId::new)
            .ok_or_else(|| anyhow::anyhow!("insert_user_book_reads did not return an id"))
    }

    async fn update_user_book_read(&self, read_id: ReadRecordId, read: &ReadRecord) -> Result<()> {
        let mutation = r#"
            mutation(
                $id: Int!
                $progress_seconds: Int!
                $started_at: date!
                $finished_at: date
                $edition_id: Int
                $reading_format_id: Int
            ) {
                update_user_book_reads(
                    where: { id: { _eq: $id } }
                    _set: {
                        progress_seconds: $progress_seconds
                        started_at: $started_at
                        finished_at: $finished_at
                        edition_id: $edition_id
                        reading_format_id: $reading_format_id
                    }
                ) {
                    affected_rows
                }
            }
        "#;
        let variables = json!({
            "id": read_id.value(),
            "progress_seconds": read.progress_seconds(),
            "started_at": read.started_at().to_string(),
            "finished_at": read.finished_at().map(|d| d.to_string()),
            "edition_id": read.edition_id().map(|e| e.value()),
            "reading_format_id": read.reading_format_id(),
        });
        self.execute_graphql(mutation, variables).await?;
        Ok(())
    }

    async fn mark_edition_owned(&self, edition_id: EditionId) -> Result<()> {
        let mutation = r#"
            mutation($edition_id: Int!) {
                update_user_books(where: { edition_id: { _eq: $edition_id } }, _set: { owned: true }) {
                    affected_rows
                }
            }
        "#;
        self.execute_graphql(mutation, json!({ "edition_id": edition_id.value() })).await?;
        Ok(())
    }
}

fn as_opt_string(row: &Value, field: &str) -> Option<String> {
    row.get(field).and_then(Value::as_str).map(str::to_string)
}

fn read_record_from_row(row: &Value) -> Result<ReadRecord> {
    let id = row.get("id").and_then(Value::as_i64).map(ReadRecordId::new).unwrap_or(ReadRecordId::unknown());
    let progress_seconds = row.get("progress_seconds").and_then(Value::as_i64).unwrap_or(0);
    let started_at = row
        .get("started_at")
        .and_then(Value::as_str)
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        .ok_or_else(|| anyhow::anyhow!("read row missing valid started_at"))?;
    let finished_at = row
        .get("finished_at")
        .and_then(Value::as_str)
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok());
    let edition_id = row.get("edition_id").and_then(Value::as_i64).map(EditionId::new);

    Ok(ReadRecord::new(id, progress_seconds, started_at)
        .with_finished_at(finished_at)
        .with_edition(edition_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = HardcoverClient::new("test-token");
        assert_eq!(client.access_token(), "test-token");
        assert!(client.rate_limiter().is_none());
    }

    #[test]
    fn test_with_rate_limiter() {
        let limiter = Arc::new(AdaptiveRateLimiter::with_defaults());
        let client = HardcoverClient::new("token").with_rate_limiter(limiter);
        assert!(client.rate_limiter().is_some());
    }

    #[test]
    fn test_custom_base_url() {
        let client = HardcoverClient::with_base_url("token", "http://localhost:8080/graphql");
        assert_eq!(client.base_url, "http://localhost:8080/graphql");
    }

    #[test]
    fn test_follow_canonical_book_id_follows_when_deduped() {
        let book = json!({ "id": 10, "book_status_id": 4, "canonical_id": 99 });
        assert_eq!(follow_canonical_book_id(Some(&book), 10), 99);
    }

    #[test]
    fn test_follow_canonical_book_id_leaves_non_deduped_alone() {
        let book = json!({ "id": 10, "book_status_id": 1, "canonical_id": null });
        assert_eq!(follow_canonical_book_id(Some(&book), 10), 10);
    }

    #[test]
    fn test_follow_canonical_book_id_falls_back_when_canonical_missing() {
        let book = json!({ "id": 10, "book_status_id": 4, "canonical_id": null });
        assert_eq!(follow_canonical_book_id(Some(&book), 10), 10);
    }

    #[test]
    fn test_read_record_from_row_preserves_all_fields() {
        let row = json!({
            "id": 42,
            "progress_seconds": 1800,
            "started_at": "2026-01-01",
            "finished_at": null,
            "edition_id": 7,
            "reading_format_id": 2
        });
        let record = read_record_from_row(&row).unwrap();
        assert_eq!(record.id().value(), 42);
        assert_eq!(record.progress_seconds(), 1800);
        assert!(record.finished_at().is_none());
        assert_eq!(record.edition_id().unwrap().value(), 7);
    }
}
