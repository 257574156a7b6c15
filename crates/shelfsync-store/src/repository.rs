//! SQLite implementation of `IProfileRepository`
//!
//! Tokens are encrypted at rest via an injected [`ISecretStore`] before
//! being written, and decrypted back to plaintext on read. The repository
//! owns that responsibility rather than pushing it onto callers, so every
//! `Profile` that crosses the port boundary already holds usable plaintext
//! tokens.
//!
//! ## Type mapping
//!
//! | Domain type             | SQL type | Strategy                         |
//! |--------------------------|----------|----------------------------------|
//! | `ProfileId`              | TEXT     | `as_str()` / `ProfileId::new()`  |
//! | `abs_token` / `hc_token` | BLOB     | AEAD ciphertext via `ISecretStore` |
//! | `SyncConfig`             | TEXT     | `serde_json`                     |
//! | `ProfileStatus`          | TEXT     | plain string                     |
//! | `DateTime<Utc>`          | TEXT     | ISO 8601 via `to_rfc3339()`      |

use std::sync::Arc;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, Secret};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use shelfsync_core::domain::profile::{Profile, ProfileStatus, SyncConfig};
use shelfsync_core::domain::newtypes::ProfileId;
use shelfsync_core::ports::profile_repository::IProfileRepository;
use shelfsync_core::ports::secret_store::ISecretStore;

use crate::StoreError;

/// SQLite-based implementation of the profile repository port.
///
/// All operations go through a connection pool; token encryption is
/// delegated to the injected `ISecretStore`.
pub struct SqliteProfileRepository {
    pool: SqlitePool,
    secrets: Arc<dyn ISecretStore>,
}

impl SqliteProfileRepository {
    pub fn new(pool: SqlitePool, secrets: Arc<dyn ISecretStore>) -> Self {
        Self { pool, secrets }
    }
}

fn status_to_string(status: &ProfileStatus) -> &'static str {
    match status {
        ProfileStatus::Idle => "idle",
        ProfileStatus::Running => "running",
        ProfileStatus::Error => "error",
        ProfileStatus::Cancelled => "cancelled",
    }
}

fn status_from_string(s: &str) -> Result<ProfileStatus, StoreError> {
    match s {
        "idle" => Ok(ProfileStatus::Idle),
        "running" => Ok(ProfileStatus::Running),
        "error" => Ok(ProfileStatus::Error),
        "cancelled" => Ok(ProfileStatus::Cancelled),
        other => Err(StoreError::SerializationError(format!("unknown profile status: {other}"))),
    }
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::SerializationError(format!("failed to parse datetime '{s}': {e}")))
}

fn parse_optional_datetime(s: Option<String>) -> Result<Option<DateTime<Utc>>, StoreError> {
    match s {
        Some(ref val) if !val.is_empty() => parse_datetime(val).map(Some),
        _ => Ok(None),
    }
}

impl SqliteProfileRepository {
    async fn profile_from_row(&self, row: &SqliteRow) -> Result<Profile, StoreError> {
        let id_str: String = row.get("id");
        let name: String = row.get("name");
        let abs_base_url: String = row.get("abs_base_url");
        let abs_token_blob: Vec<u8> = row.get("abs_token_blob");
        let hc_token_blob: Vec<u8> = row.get("hc_token_blob");
        let sync_config_json: String = row.get("sync_config_json");
        let status_str: String = row.get("status");
        let last_run_str: Option<String> = row.get("last_run");
        let last_error: Option<String> = row.get("last_error");

        let id = ProfileId::new(id_str.clone())
            .map_err(|e| StoreError::SerializationError(format!("invalid profile id '{id_str}': {e}")))?;

        let abs_token = self
            .secrets
            .decrypt(&abs_token_blob)
            .await
            .map_err(|e| StoreError::SerializationError(format!("failed to decrypt abs token: {e}")))?;
        let hc_token = self
            .secrets
            .decrypt(&hc_token_blob)
            .await
            .map_err(|e| StoreError::SerializationError(format!("failed to decrypt hc token: {e}")))?;

        let sync_config: SyncConfig = serde_json::from_str(&sync_config_json)
            .map_err(|e| StoreError::SerializationError(format!("invalid sync_config JSON: {e}")))?;

        let status = status_from_string(&status_str)?;
        let last_run = parse_optional_datetime(last_run_str)?;

        Ok(Profile::from_stored(
            id,
            name,
            abs_base_url,
            abs_token.expose_secret().to_string(),
            hc_token.expose_secret().to_string(),
            sync_config,
            status,
            last_run,
            last_error,
        ))
    }
}

#[async_trait::async_trait]
impl IProfileRepository for SqliteProfileRepository {
    async fn save(&self, profile: &Profile) -> anyhow::Result<()> {
        let abs_token_blob = self
            .secrets
            .encrypt(&Secret::new(profile.abs_token().to_string()))
            .await?;
        let hc_token_blob = self
            .secrets
            .encrypt(&Secret::new(profile.hc_token().to_string()))
            .await?;
        let sync_config_json = serde_json::to_string(profile.sync_config())?;
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO profiles (
                id, name, abs_base_url, abs_token_blob, hc_token_blob,
                sync_config_json, status, last_run, last_error, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                abs_base_url = excluded.abs_base_url,
                abs_token_blob = excluded.abs_token_blob,
                hc_token_blob = excluded.hc_token_blob,
                sync_config_json = excluded.sync_config_json,
                status = excluded.status,
                last_run = excluded.last_run,
                last_error = excluded.last_error,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(profile.id().as_str())
        .bind(profile.name())
        .bind(profile.abs_base_url())
        .bind(abs_token_blob)
        .bind(hc_token_blob)
        .bind(sync_config_json)
        .bind(status_to_string(profile.status()))
        .bind(profile.last_run().map(|dt| dt.to_rfc3339()))
        .bind(profile.last_error())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("failed to upsert profile: {e}")))?;

        Ok(())
    }

    async fn get(&self, id: &ProfileId) -> anyhow::Result<Option<Profile>> {
        let row = sqlx::query("SELECT * FROM profiles WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("failed to fetch profile: {e}")))?;

        match row {
            Some(row) => Ok(Some(self.profile_from_row(&row).await?)),
            None => Ok(None),
        }
    }

    async fn list(&self) -> anyhow::Result<Vec<Profile>> {
        let rows = sqlx::query("SELECT * FROM profiles ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("failed to list profiles: {e}")))?;

        let mut profiles = Vec::with_capacity(rows.len());
        for row in &rows {
            profiles.push(self.profile_from_row(row).await?);
        }
        Ok(profiles)
    }

    async fn delete(&self, id: &ProfileId) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM profiles WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("failed to delete profile: {e}")))?;
        Ok(())
    }
}
