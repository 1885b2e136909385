//! Configuration module for bdaykeeper.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.
//! The values here are the bundled defaults; admin settings and the cached
//! remote configuration are layered on top by
//! [`LayeredConfigSource`](crate::usecases::LayeredConfigSource).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{newtypes::RemoteId, target::BirthdayTarget};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for bdaykeeper.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub target: TargetConfig,
    pub sync: SyncConfig,
    pub drive: DriveConfig,
    pub auth: AuthConfig,
    pub alarm: AlarmConfig,
    pub state: StateConfig,
    pub logging: LoggingConfig,
}

/// What to sync and when to notify.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Drive folder holding the export files. `None` until configured.
    pub folder_id: Option<String>,
    /// Local name of the cached export file.
    pub file_name: String,
    /// Remote files must end with this suffix to be considered.
    pub match_suffix: String,
    /// Wall-clock notification time, interpreted in Europe/Warsaw.
    pub birthday: BirthdayTarget,
}

/// Periodic sync settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Hours between periodic sync passes.
    pub check_interval_hours: u64,
    /// Directory holding the cached export file.
    pub cache_dir: PathBuf,
    /// First backoff delay (seconds) after a retryable failure.
    pub retry_base_secs: u64,
    /// Upper bound (seconds) for the retry backoff.
    pub retry_max_secs: u64,
    /// Consecutive authentication failures before escalating to an error log.
    pub auth_failure_alert_threshold: u32,
}

/// Google Drive API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    /// Base URL of the Drive v3 REST API.
    pub base_url: String,
    /// Timeout (seconds) for listing and metadata calls.
    pub request_timeout_secs: u64,
    /// Timeout (seconds) for a complete file download.
    pub download_timeout_secs: u64,
    /// Files requested per listing page (1-1000).
    pub page_size: u32,
    /// Name of the remote configuration document inside the folder.
    pub remote_config_file_name: String,
}

/// OAuth settings for the keyring credential source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// OAuth client ID. `None` until the user runs `bdaykeeper auth import`.
    pub client_id: Option<String>,
    /// OAuth client secret, for client types that have one.
    pub client_secret: Option<String>,
    /// Keyring username the tokens are stored under.
    pub account: String,
    /// OAuth token endpoint used for refresh-token grants.
    pub token_url: String,
}

/// Alarm delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlarmConfig {
    /// Whether precise alarms are permitted on this host.
    pub allow_exact: bool,
    /// Maximum delay (seconds) an inexact alarm may add.
    pub inexact_slack_secs: u64,
}

/// Local persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// JSON file holding admin overrides and the cached remote config.
    pub settings_path: PathBuf,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Output format: `text` or `json`.
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
    /// Typically `$XDG_CONFIG_HOME/bdaykeeper/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("bdaykeeper")
            .join("config.yaml")
    }

    /// Interval between periodic sync passes.
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.sync.check_interval_hours * 3600)
    }

    /// Full path of the cached export file for a given file name.
    pub fn cache_path(&self, file_name: &str) -> PathBuf {
        self.sync.cache_dir.join(file_name)
    }
}

// ---------------------------------------------------------------------------
// Config::default()
// ---------------------------------------------------------------------------

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join("bdaykeeper")
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            folder_id: None,
            file_name: "backup.daylio".to_string(),
            match_suffix: ".daylio".to_string(),
            birthday: BirthdayTarget {
                year: 2027,
                month: 1,
                day: 12,
                hour: 8,
                minute: 0,
            },
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            check_interval_hours: 6,
            cache_dir: data_dir().join("cache"),
            retry_base_secs: 30,
            retry_max_secs: 3600,
            auth_failure_alert_threshold: 3,
        }
    }
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.googleapis.com/drive/v3".to_string(),
            request_timeout_secs: 30,
            download_timeout_secs: 300,
            page_size: 100,
            remote_config_file_name: "bdaykeeper_config.json".to_string(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            account: "default".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
        }
    }
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            allow_exact: true,
            inexact_slack_secs: 600,
        }
    }
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            settings_path: data_dir().join("settings.json"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"sync.check_interval_hours"`.
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
const VALID_LOG_FORMATS: &[&str] = &["text", "json"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- target ---
        if let Some(folder_id) = &self.target.folder_id {
            if let Err(e) = RemoteId::new(folder_id.clone()) {
                errors.push(ValidationError {
                    field: "target.folder_id".into(),
                    message: e.to_string(),
                });
            }
        }
        if self.target.file_name.trim().is_empty() {
            errors.push(ValidationError {
                field: "target.file_name".into(),
                message: "must not be empty".into(),
            });
        } else if self.target.file_name.contains(['/', '\\']) {
            errors.push(ValidationError {
                field: "target.file_name".into(),
                message: format!("must be a bare file name: {}", self.target.file_name),
            });
        }
        if let Err(e) = self.target.birthday.validate() {
            errors.push(ValidationError {
                field: "target.birthday".into(),
                message: e.to_string(),
            });
        }

        // --- sync ---
        if self.sync.check_interval_hours == 0 {
            errors.push(ValidationError {
                field: "sync.check_interval_hours".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.sync.retry_base_secs == 0 {
            errors.push(ValidationError {
                field: "sync.retry_base_secs".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.sync.retry_max_secs < self.sync.retry_base_secs {
            errors.push(ValidationError {
                field: "sync.retry_max_secs".into(),
                message: format!(
                    "retry_max_secs ({}) must not be below retry_base_secs ({})",
                    self.sync.retry_max_secs, self.sync.retry_base_secs
                ),
            });
        }
        if self.sync.auth_failure_alert_threshold == 0 {
            errors.push(ValidationError {
                field: "sync.auth_failure_alert_threshold".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- drive ---
        if !(self.drive.base_url.starts_with("https://")
            || self.drive.base_url.starts_with("http://"))
        {
            errors.push(ValidationError {
                field: "drive.base_url".into(),
                message: format!("not an http(s) URL: {}", self.drive.base_url),
            });
        }
        if self.drive.request_timeout_secs == 0 {
            errors.push(ValidationError {
                field: "drive.request_timeout_secs".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.drive.download_timeout_secs == 0 {
            errors.push(ValidationError {
                field: "drive.download_timeout_secs".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.drive.page_size == 0 || self.drive.page_size > 1000 {
            errors.push(ValidationError {
                field: "drive.page_size".into(),
                message: "must be in range 1..=1000".into(),
            });
        }
        if self.drive.remote_config_file_name.trim().is_empty() {
            errors.push(ValidationError {
                field: "drive.remote_config_file_name".into(),
                message: "must not be empty".into(),
            });
        }

        // --- auth ---
        if self.auth.account.trim().is_empty() {
            errors.push(ValidationError {
                field: "auth.account".into(),
                message: "must not be empty".into(),
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
/// Starts from defaults and lets callers override individual fields.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a builder pre-populated with default values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // -- target --

    pub fn target_folder_id(mut self, folder_id: impl Into<String>) -> Self {
        self.config.target.folder_id = Some(folder_id.into());
        self
    }

    pub fn target_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.config.target.file_name = file_name.into();
        self
    }

    pub fn target_match_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.config.target.match_suffix = suffix.into();
        self
    }

    pub fn target_birthday(mut self, birthday: BirthdayTarget) -> Self {
        self.config.target.birthday = birthday;
        self
    }

    // -- sync --

    pub fn sync_check_interval_hours(mut self, hours: u64) -> Self {
        self.config.sync.check_interval_hours = hours;
        self
    }

    pub fn sync_cache_dir(mut self, dir: PathBuf) -> Self {
        self.config.sync.cache_dir = dir;
        self
    }

    pub fn sync_retry_base_secs(mut self, secs: u64) -> Self {
        self.config.sync.retry_base_secs = secs;
        self
    }

    pub fn sync_retry_max_secs(mut self, secs: u64) -> Self {
        self.config.sync.retry_max_secs = secs;
        self
    }

    // -- drive --

    pub fn drive_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.drive.base_url = url.into();
        self
    }

    pub fn drive_page_size(mut self, n: u32) -> Self {
        self.config.drive.page_size = n;
        self
    }

    pub fn drive_remote_config_file_name(mut self, name: impl Into<String>) -> Self {
        self.config.drive.remote_config_file_name = name.into();
        self
    }

    // -- auth --

    pub fn auth_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.config.auth.client_id = Some(client_id.into());
        self
    }

    pub fn auth_account(mut self, account: impl Into<String>) -> Self {
        self.config.auth.account = account.into();
        self
    }

    // -- alarm --

    pub fn alarm_allow_exact(mut self, allow: bool) -> Self {
        self.config.alarm.allow_exact = allow;
        self
    }

    pub fn alarm_inexact_slack_secs(mut self, secs: u64) -> Self {
        self.config.alarm.inexact_slack_secs = secs;
        self
    }

    // -- state --

    pub fn state_settings_path(mut self, path: PathBuf) -> Self {
        self.config.state.settings_path = path;
        self
    }

    // -- logging --

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_format(mut self, format: impl Into<String>) -> Self {
        self.config.logging.format = format.into();
        self
    }

    /// Consume the builder and return the [`Config`] without validation.
    pub fn build(self) -> Config {
        self.config
    }

    /// Consume the builder, validate, and return the [`Config`] or errors.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let errors = self.config.validate();
        if errors.is_empty() {
            Ok(self.config)
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
// Tests
// ---------------------------------------------------------------------------
