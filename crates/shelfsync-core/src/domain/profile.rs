//! Profile domain entity
//!
//! A `Profile` is the identity and configuration for one user's sync: which
//! ABS server and tokens to use, and the knobs governing engine behavior.
//! Tokens are never stored in plaintext here — see `shelfsync-secrets`.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};

use super::newtypes::ProfileId;

/// Lifecycle state of a profile's sync activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileStatus {
    #[default]
    Idle,
    Running,
    Error,
    Cancelled,
}

impl std::fmt::Display for ProfileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProfileStatus::Idle => write!(f, "idle"),
            ProfileStatus::Running => write!(f, "running"),
            ProfileStatus::Error => write!(f, "error"),
            ProfileStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// How an ambiguous audiobook-edition match (book found, no audiobook
/// edition) is handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudiobookMatchMode {
    #[default]
    Continue,
    Skip,
    Fail,
}

/// Whether incremental (watermark-bounded) syncing is attempted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncrementalMode {
    #[default]
    Auto,
    Enabled,
    Disabled,
}

/// Per-profile knobs governing the decision engine and orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub sync_interval_secs: u64,
    pub min_progress_threshold: f64,
    pub sync_want_to_read: bool,
    pub sync_owned: bool,
    pub process_unread_books: bool,
    pub include_ebooks: bool,
    pub library_include: Vec<String>,
    pub library_exclude: Vec<String>,
    pub incremental_mode: IncrementalMode,
    pub min_change_threshold_secs: u64,
    pub dry_run: bool,
    pub mismatch_output_dir: std::path::PathBuf,
    pub state_file_path: std::path::PathBuf,
    pub force_full_sync: bool,
    pub audiobook_match_mode: AudiobookMatchMode,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            sync_interval_secs: 3600,
            min_progress_threshold: 0.0,
            sync_want_to_read: true,
            sync_owned: true,
            process_unread_books: true,
            include_ebooks: false,
            library_include: Vec::new(),
            library_exclude: Vec::new(),
            incremental_mode: IncrementalMode::Auto,
            min_change_threshold_secs: 30,
            dry_run: false,
            mismatch_output_dir: std::path::PathBuf::from("mismatches"),
            state_file_path: std::path::PathBuf::from("sync_state.json"),
            force_full_sync: false,
            audiobook_match_mode: AudiobookMatchMode::Continue,
        }
    }
}

/// Identity and configuration for one user's sync.
///
/// Tokens are held as [`Secret<String>`] so that `Debug`/`Display`/logging
/// never accidentally leak them; they are decrypted into this shape only for
/// the duration of a run and dropped (zeroized by `secrecy`) afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    id: ProfileId,
    name: String,
    abs_base_url: String,
    #[serde(skip_serializing)]
    abs_token: Secret<String>,
    #[serde(skip_serializing)]
    hc_token: Secret<String>,
    sync_config: SyncConfig,
    status: ProfileStatus,
    last_run: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

impl Profile {
    pub fn new(
        id: ProfileId,
        name: impl Into<String>,
        abs_base_url: impl Into<String>,
        abs_token: String,
        hc_token: String,
        sync_config: SyncConfig,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            abs_base_url: abs_base_url.into(),
            abs_token: Secret::new(abs_token),
            hc_token: Secret::new(hc_token),
            sync_config,
            status: ProfileStatus::Idle,
            last_run: None,
            last_error: None,
        }
    }

    pub fn id(&self) -> &ProfileId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn abs_base_url(&self) -> &str {
        &self.abs_base_url
    }

    pub fn abs_token(&self) -> &str {
        self.abs_token.expose_secret()
    }

    pub fn hc_token(&self) -> &str {
        self.hc_token.expose_secret()
    }

    pub fn sync_config(&self) -> &SyncConfig {
        &self.sync_config
    }

    pub fn sync_config_mut(&mut self) -> &mut SyncConfig {
        &mut self.sync_config
    }

    pub fn status(&self) -> &ProfileStatus {
        &self.status
    }

    pub fn last_run(&self) -> Option<DateTime<Utc>> {
        self.last_run
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn mark_running(&mut self) {
        self.status = ProfileStatus::Running;
        self.last_error = None;
    }

    pub fn mark_idle(&mut self, finished_at: DateTime<Utc>) {
        self.status = ProfileStatus::Idle;
        self.last_run = Some(finished_at);
    }

    pub fn mark_error(&mut self, reason: impl Into<String>) {
        self.status = ProfileStatus::Error;
        self.last_error = Some(reason.into());
    }

    pub fn mark_cancelled(&mut self) {
        self.status = ProfileStatus::Cancelled;
    }

    pub fn can_start_run(&self) -> bool {
        !matches!(self.status, ProfileStatus::Running)
    }

    /// Reconstructs a `Profile` from stored fields, for use by
    /// `IProfileRepository` implementations loading a persisted row. Unlike
    /// [`Profile::new`], this accepts the full lifecycle state rather than
    /// always starting idle.
    #[allow(clippy::too_many_arguments)]
    pub fn from_stored(
        id: ProfileId,
        name: impl Into<String>,
        abs_base_url: impl Into<String>,
        abs_token: String,
        hc_token: String,
        sync_config: SyncConfig,
        status: ProfileStatus,
        last_run: Option<DateTime<Utc>>,
        last_error: Option<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            abs_base_url: abs_base_url.into(),
            abs_token: Secret::new(abs_token),
            hc_token: Secret::new(hc_token),
            sync_config,
            status,
            last_run,
            last_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_profile() -> Profile {
        Profile::new(
            ProfileId::new("p1").unwrap(),
            "Alice",
            "https://abs.example.com",
            "abs-token".to_string(),
            "hc-token".to_string(),
            SyncConfig::default(),
        )
    }

    #[test]
    fn new_profile_is_idle() {
        let p = test_profile();
        assert_eq!(*p.status(), ProfileStatus::Idle);
        assert!(p.can_start_run());
        assert_eq!(p.abs_token(), "abs-token");
    }

    #[test]
    fn running_profile_cannot_start_again() {
        let mut p = test_profile();
        p.mark_running();
        assert!(!p.can_start_run());
    }

    #[test]
    fn mark_error_sets_status_and_message() {
        let mut p = test_profile();
        p.mark_running();
        p.mark_error("token rejected");
        assert_eq!(*p.status(), ProfileStatus::Error);
        assert_eq!(p.last_error(), Some("token rejected"));
    }

    #[test]
    fn mark_idle_records_last_run() {
        let mut p = test_profile();
        p.mark_running();
        let now = Utc::now();
        p.mark_idle(now);
        assert_eq!(*p.status(), ProfileStatus::Idle);
        assert_eq!(p.last_run(), Some(now));
    }

    #[test]
    fn tokens_never_serialize() {
        let p = test_profile();
        let json = serde_json::to_string(&p).unwrap();
        assert!(!json.contains("abs-token"));
        assert!(!json.contains("hc-token"));
    }

    #[test]
    fn sync_config_defaults_are_sensible() {
        let cfg = SyncConfig::default();
        assert!(cfg.sync_want_to_read);
        assert!(cfg.sync_owned);
        assert!(!cfg.include_ebooks);
        assert_eq!(cfg.audiobook_match_mode, AudiobookMatchMode::Continue);
    }
}
