//! Configuration module for ShelfSync.
//!
//! Provides typed configuration structs that map to the YAML configuration
//! file, with loading, validation, defaults, and a builder pattern for
//! programmatic use.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::{AudiobookMatchMode, IncrementalMode};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for the ShelfSync daemon.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub daemon: DaemonConfig,
    pub database: DatabaseConfig,
    pub rate_limiting: RateLimitingConfig,
    pub sync_defaults: SyncDefaultsConfig,
    pub logging: LoggingConfig,
}

/// Daemon-wide process settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Directory holding the encryption key file, cache snapshots, and
    /// mismatch output (unless a profile overrides `mismatch_output_dir`).
    pub data_dir: PathBuf,
    /// Seconds between coordinator scheduler ticks; each profile's own
    /// `syncInterval` still governs when that profile's run fires.
    pub poll_interval_secs: u64,
    /// Override for the encryption key file path; defaults to
    /// `<data_dir>/secret.key` when unset.
    pub encryption_key_path: Option<PathBuf>,
}

/// Profile repository storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file backing the profile repository.
    pub path: PathBuf,
}

/// Hardcover / Audiobookshelf rate-limiting settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    pub hc_requests_per_minute: u32,
    pub abs_requests_per_minute: u32,
    pub hc_burst: u32,
    pub abs_burst: u32,
}

/// Default `SyncConfig` values applied to newly-created profiles; mirrors
/// `domain::profile::SyncConfig` field-for-field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncDefaultsConfig {
    pub sync_interval_secs: u64,
    pub min_progress_threshold: f64,
    pub sync_want_to_read: bool,
    pub sync_owned: bool,
    pub process_unread_books: bool,
    pub include_ebooks: bool,
    pub incremental_mode: IncrementalMode,
    pub min_change_threshold_secs: u64,
    pub dry_run: bool,
    pub mismatch_output_dir: PathBuf,
    pub audiobook_match_mode: AudiobookMatchMode,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Output format: `pretty` or `json`.
    pub format: String,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/shelfsync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("shelfsync")
            .join("config.yaml")
    }
}

// ---------------------------------------------------------------------------
// Config::default()
// ---------------------------------------------------------------------------

impl Default for DaemonConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("shelfsync");
        Self {
            data_dir,
            poll_interval_secs: 60,
            encryption_key_path: None,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("shelfsync");
        Self {
            path: data_dir.join("shelfsync.sqlite"),
        }
    }
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            hc_requests_per_minute: 60,
            abs_requests_per_minute: 300,
            hc_burst: 3,
            abs_burst: 5,
        }
    }
}

impl Default for SyncDefaultsConfig {
    fn default() -> Self {
        Self {
            sync_interval_secs: 3600,
            min_progress_threshold: 0.0,
            sync_want_to_read: true,
            sync_owned: true,
            process_unread_books: true,
            include_ebooks: false,
            incremental_mode: IncrementalMode::Auto,
            min_change_threshold_secs: 30,
            dry_run: false,
            mismatch_output_dir: PathBuf::from("mismatches"),
            audiobook_match_mode: AudiobookMatchMode::Continue,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"rate_limiting.hc_burst"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Valid values for `logging.format`.
const VALID_LOG_FORMATS: &[&str] = &["pretty", "json"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- daemon ---
        if self.daemon.poll_interval_secs == 0 {
            errors.push(ValidationError {
                field: "daemon.poll_interval_secs".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- rate_limiting ---
        if self.rate_limiting.hc_requests_per_minute == 0 {
            errors.push(ValidationError {
                field: "rate_limiting.hc_requests_per_minute".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.rate_limiting.abs_requests_per_minute == 0 {
            errors.push(ValidationError {
                field: "rate_limiting.abs_requests_per_minute".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.rate_limiting.hc_burst == 0 {
            errors.push(ValidationError {
                field: "rate_limiting.hc_burst".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.rate_limiting.abs_burst == 0 {
            errors.push(ValidationError {
                field: "rate_limiting.abs_burst".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- sync_defaults ---
        if !(0.0..=1.0).contains(&self.sync_defaults.min_progress_threshold) {
            errors.push(ValidationError {
                field: "sync_defaults.min_progress_threshold".into(),
                message: "must be in range 0.0..=1.0".into(),
            });
        }
        if self.sync_defaults.sync_interval_secs == 0 {
            errors.push(ValidationError {
                field: "sync_defaults.sync_interval_secs".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }
        if !VALID_LOG_FORMATS.contains(&self.logging.format.as_str()) {
            errors.push(ValidationError {
                field: "logging.format".into(),
                message: format!(
                    "invalid format '{}'; valid options: {}",
                    self.logging.format,
                    VALID_LOG_FORMATS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use shelfsync_core::config::ConfigBuilder;
/// use std::path::PathBuf;
///
/// let config = ConfigBuilder::new()
///     .daemon_data_dir(PathBuf::from("/var/lib/shelfsync"))
///     .rate_limiting_hc_requests_per_minute(30)
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- daemon ---

    pub fn daemon_data_dir(mut self, data_dir: PathBuf) -> Self {
        self.config.daemon.data_dir = data_dir;
        self
    }

    pub fn daemon_poll_interval_secs(mut self, seconds: u64) -> Self {
        self.config.daemon.poll_interval_secs = seconds;
        self
    }

    pub fn daemon_encryption_key_path(mut self, path: PathBuf) -> Self {
        self.config.daemon.encryption_key_path = Some(path);
        self
    }

    // --- database ---

    pub fn database_path(mut self, path: PathBuf) -> Self {
        self.config.database.path = path;
        self
    }

    // --- rate_limiting ---

    pub fn rate_limiting_hc_requests_per_minute(mut self, n: u32) -> Self {
        self.config.rate_limiting.hc_requests_per_minute = n;
        self
    }

    pub fn rate_limiting_abs_requests_per_minute(mut self, n: u32) -> Self {
        self.config.rate_limiting.abs_requests_per_minute = n;
        self
    }

    pub fn rate_limiting_hc_burst(mut self, n: u32) -> Self {
        self.config.rate_limiting.hc_burst = n;
        self
    }

    pub fn rate_limiting_abs_burst(mut self, n: u32) -> Self {
        self.config.rate_limiting.abs_burst = n;
        self
    }

    // --- sync_defaults ---

    pub fn sync_defaults_interval_secs(mut self, seconds: u64) -> Self {
        self.config.sync_defaults.sync_interval_secs = seconds;
        self
    }

    pub fn sync_defaults_min_progress_threshold(mut self, threshold: f64) -> Self {
        self.config.sync_defaults.min_progress_threshold = threshold;
        self
    }

    pub fn sync_defaults_sync_want_to_read(mut self, value: bool) -> Self {
        self.config.sync_defaults.sync_want_to_read = value;
        self
    }

    pub fn sync_defaults_sync_owned(mut self, value: bool) -> Self {
        self.config.sync_defaults.sync_owned = value;
        self
    }

    pub fn sync_defaults_dry_run(mut self, value: bool) -> Self {
        self.config.sync_defaults.dry_run = value;
        self
    }

    pub fn sync_defaults_audiobook_match_mode(mut self, mode: AudiobookMatchMode) -> Self {
        self.config.sync_defaults.audiobook_match_mode = mode;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_format(mut self, format: impl Into<String>) -> Self {
        self.config.logging.format = format.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    // -- Defaults --

    #[test]
    fn default_config_has_sensible_values() {
        let cfg = Config::default();
        assert_eq!(cfg.daemon.poll_interval_secs, 60);
        assert!(cfg.daemon.data_dir.to_string_lossy().contains("shelfsync"));
        assert_eq!(cfg.rate_limiting.hc_requests_per_minute, 60);
        assert_eq!(cfg.rate_limiting.abs_requests_per_minute, 300);
        assert!(cfg.sync_defaults.sync_want_to_read);
        assert!(cfg.sync_defaults.sync_owned);
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.logging.format, "pretty");
    }

    #[test]
    fn default_config_passes_validation() {
        let cfg = Config::default();
        let errors = cfg.validate();
        assert!(errors.is_empty(), "unexpected validation errors: {errors:?}");
    }

    // -- Loading --

    #[test]
    fn load_from_yaml_file() {
        let yaml = r#"
daemon:
  data_dir: /tmp/shelfsync-data
  poll_interval_secs: 30
  encryption_key_path: null
database:
  path: /tmp/shelfsync-data/shelfsync.sqlite
rate_limiting:
  hc_requests_per_minute: 30
  abs_requests_per_minute: 200
  hc_burst: 2
  abs_burst: 3
sync_defaults:
  sync_interval_secs: 1800
  min_progress_threshold: 0.05
  sync_want_to_read: true
  sync_owned: false
  process_unread_books: true
  include_ebooks: false
  incremental_mode: auto
  min_change_threshold_secs: 30
  dry_run: false
  mismatch_output_dir: mismatches
  audiobook_match_mode: continue
logging:
  level: debug
  format: json
"#;
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(yaml.as_bytes()).unwrap();
        tmp.flush().unwrap();

        let cfg = Config::load(tmp.path()).expect("load config");
        assert_eq!(cfg.daemon.data_dir, PathBuf::from("/tmp/shelfsync-data"));
        assert_eq!(cfg.daemon.poll_interval_secs, 30);
        assert_eq!(cfg.rate_limiting.hc_requests_per_minute, 30);
        assert_eq!(cfg.sync_defaults.sync_owned, false);
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.logging.format, "json");
    }

    #[test]
    fn load_or_default_returns_default_on_missing_file() {
        let cfg = Config::load_or_default(Path::new("/nonexistent/config.yaml"));
        assert_eq!(cfg.daemon.poll_interval_secs, 60);
    }

    #[test]
    fn load_returns_error_on_invalid_yaml() {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(b"not: [valid: yaml: {{{").unwrap();
        tmp.flush().unwrap();

        let result = Config::load(tmp.path());
        assert!(result.is_err());
    }

    #[test]
    fn load_or_default_on_corrupt_file_never_panics() {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(b"{ this is not yaml at all ][").unwrap();
        tmp.flush().unwrap();

        let cfg = Config::load_or_default(tmp.path());
        assert_eq!(cfg.daemon.poll_interval_secs, 60);
    }

    // -- Validation --

    #[test]
    fn validate_catches_zero_poll_interval() {
        let mut cfg = Config::default();
        cfg.daemon.poll_interval_secs = 0;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "daemon.poll_interval_secs"));
    }

    #[test]
    fn validate_catches_zero_rate_limiting_values() {
        let mut cfg = Config::default();
        cfg.rate_limiting.hc_requests_per_minute = 0;
        cfg.rate_limiting.abs_requests_per_minute = 0;
        cfg.rate_limiting.hc_burst = 0;
        cfg.rate_limiting.abs_burst = 0;
        let errors = cfg.validate();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"rate_limiting.hc_requests_per_minute"));
        assert!(fields.contains(&"rate_limiting.abs_requests_per_minute"));
        assert!(fields.contains(&"rate_limiting.hc_burst"));
        assert!(fields.contains(&"rate_limiting.abs_burst"));
    }

    #[test]
    fn validate_catches_out_of_range_progress_threshold() {
        let mut cfg = Config::default();
        cfg.sync_defaults.min_progress_threshold = 1.5;
        let errors = cfg.validate();
        assert!(errors
            .iter()
            .any(|e| e.field == "sync_defaults.min_progress_threshold"));
    }

    #[test]
    fn validate_catches_invalid_log_level() {
        let mut cfg = Config::default();
        cfg.logging.level = "verbose".to_string();
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "logging.level"));
    }

    #[test]
    fn validate_catches_invalid_log_format() {
        let mut cfg = Config::default();
        cfg.logging.format = "xml".to_string();
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "logging.format"));
    }

    #[test]
    fn validate_accepts_all_valid_log_levels() {
        for level in VALID_LOG_LEVELS {
            let mut cfg = Config::default();
            cfg.logging.level = level.to_string();
            let errors = cfg.validate();
            assert!(
                !errors.iter().any(|e| e.field == "logging.level"),
                "level '{level}' should be valid"
            );
        }
    }

    // -- Builder --

    #[test]
    fn builder_starts_from_defaults() {
        let cfg = ConfigBuilder::new().build();
        assert_eq!(cfg.daemon.poll_interval_secs, 60);
        assert!(cfg.sync_defaults.sync_owned);
    }

    #[test]
    fn builder_overrides_fields() {
        let cfg = ConfigBuilder::new()
            .daemon_data_dir(PathBuf::from("/custom/path"))
            .daemon_poll_interval_secs(120)
            .rate_limiting_hc_requests_per_minute(20)
            .rate_limiting_hc_burst(5)
            .sync_defaults_dry_run(true)
            .sync_defaults_audiobook_match_mode(AudiobookMatchMode::Skip)
            .logging_level("debug")
            .logging_format("json")
            .build();

        assert_eq!(cfg.daemon.data_dir, PathBuf::from("/custom/path"));
        assert_eq!(cfg.daemon.poll_interval_secs, 120);
        assert_eq!(cfg.rate_limiting.hc_requests_per_minute, 20);
        assert_eq!(cfg.rate_limiting.hc_burst, 5);
        assert!(cfg.sync_defaults.dry_run);
        assert_eq!(cfg.sync_defaults.audiobook_match_mode, AudiobookMatchMode::Skip);
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.logging.format, "json");
    }

    #[test]
    fn builder_build_validated_succeeds_for_valid_config() {
        let result = ConfigBuilder::new().build_validated();
        assert!(result.is_ok());
    }

    #[test]
    fn builder_build_validated_fails_for_invalid_config() {
        let result = ConfigBuilder::new()
            .daemon_poll_interval_secs(0)
            .logging_level("nope")
            .build_validated();
        assert!(result.is_err());
        let errors = result.unwrap_err();
        assert!(errors.len() >= 2);
    }

    // -- default_path --

    #[test]
    fn default_path_ends_with_config_yaml() {
        let p = Config::default_path();
        assert!(p.ends_with("shelfsync/config.yaml"));
    }

    // -- ValidationError Display --

    #[test]
    fn validation_error_display() {
        let err = ValidationError {
            field: "daemon.poll_interval_secs".into(),
            message: "must be greater than 0".into(),
        };
        assert_eq!(
            err.to_string(),
            "daemon.poll_interval_secs: must be greater than 0"
        );
    }
}
