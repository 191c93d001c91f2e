//! Configuration module for bibsync.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::UserId;

/// Environment variable that overrides `remote.api_key`.
pub const API_KEY_ENV: &str = "BIBSYNC_API_KEY";

/// Upper bound the remote accepts for keys in one fetch-by-keys request.
pub const MAX_KEYS_PER_REQUEST: usize = 50;

/// Directory name under the platform config and data directories.
const APP_DIR: &str = "bibsync";

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for bibsync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sync: SyncConfig,
    pub remote: RemoteConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// Synchronization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Seconds between polling cycles in `watch` mode.
    pub poll_interval: u64,
    /// Libraries synchronized concurrently. `1` processes them one by one.
    pub max_concurrent_libraries: usize,
    /// Whether group libraries are synchronized alongside the personal one.
    pub include_groups: bool,
}

/// Remote Web API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// API root, without a trailing slash.
    pub base_url: String,
    /// API key. `BIBSYNC_API_KEY` takes precedence when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// User ID; resolved from the API key when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    /// Keys per fetch-by-keys request (1..=50).
    pub keys_per_request: usize,
    /// Retries for throttled (429/503) responses.
    pub max_retries: u32,
}

/// Local storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the SQLite database.
    pub database: PathBuf,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Loading
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
    /// Typically `$XDG_CONFIG_HOME/bibsync/config.yaml` on Linux, or
    /// `bibsync/config.yaml` relative to the working directory when the
    /// platform has no config directory.
    pub fn default_path() -> PathBuf {
        app_dir(dirs::config_dir()).join("config.yaml")
    }

    /// The API key to use: the environment override, else the configured key.
    pub fn api_key(&self) -> Option<String> {
        resolve_api_key(std::env::var(API_KEY_ENV).ok(), self.remote.api_key.as_deref())
    }
}

fn resolve_api_key(from_env: Option<String>, configured: Option<&str>) -> Option<String> {
    from_env
        .filter(|key| !key.trim().is_empty())
        .or_else(|| configured.map(str::to_string))
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: 300,
            max_concurrent_libraries: 1,
            include_groups: true,
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.zotero.org".to_string(),
            api_key: None,
            user_id: None,
            keys_per_request: MAX_KEYS_PER_REQUEST,
            max_retries: 3,
        }
    }
}

/// `<base>/bibsync`, or a relative `bibsync` directory without a base
fn app_dir(base: Option<PathBuf>) -> PathBuf {
    match base {
        Some(base) => base.join(APP_DIR),
        None => PathBuf::from(APP_DIR),
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: app_dir(dirs::data_local_dir()).join("library.db"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"sync.poll_interval"`.
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

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid. A missing API key
    /// is not an error here; commands that talk to the remote check for it.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- sync ---
        if self.sync.poll_interval == 0 {
            errors.push(ValidationError {
                field: "sync.poll_interval".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.sync.max_concurrent_libraries == 0 {
            errors.push(ValidationError {
                field: "sync.max_concurrent_libraries".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- remote ---
        let base_url = self.remote.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            errors.push(ValidationError {
                field: "remote.base_url".into(),
                message: format!("must be an http(s) URL, got '{}'", self.remote.base_url),
            });
        }
        if self.remote.keys_per_request == 0 || self.remote.keys_per_request > MAX_KEYS_PER_REQUEST
        {
            errors.push(ValidationError {
                field: "remote.keys_per_request".into(),
                message: format!(
                    "must be between 1 and {MAX_KEYS_PER_REQUEST}, got {}",
                    self.remote.keys_per_request
                ),
            });
        }
        if let Some(key) = &self.remote.api_key {
            if key.trim().is_empty() {
                errors.push(ValidationError {
                    field: "remote.api_key".into(),
                    message: "must not be empty when set".into(),
                });
            }
        }

        // --- storage ---
        if self.storage.database.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "storage.database".into(),
                message: "must not be empty".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; expected one of: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
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
/// use bibsync_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .remote_base_url("http://localhost:8080")
///     .sync_poll_interval(60)
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

    // --- sync ---

    pub fn sync_poll_interval(mut self, seconds: u64) -> Self {
        self.config.sync.poll_interval = seconds;
        self
    }

    pub fn sync_max_concurrent_libraries(mut self, n: usize) -> Self {
        self.config.sync.max_concurrent_libraries = n;
        self
    }

    pub fn sync_include_groups(mut self, include: bool) -> Self {
        self.config.sync.include_groups = include;
        self
    }

    // --- remote ---

    pub fn remote_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.remote.base_url = url.into();
        self
    }

    pub fn remote_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.remote.api_key = Some(key.into());
        self
    }

    pub fn remote_user_id(mut self, user_id: UserId) -> Self {
        self.config.remote.user_id = Some(user_id);
        self
    }

    pub fn remote_keys_per_request(mut self, n: usize) -> Self {
        self.config.remote.keys_per_request = n;
        self
    }

    pub fn remote_max_retries(mut self, n: u32) -> Self {
        self.config.remote.max_retries = n;
        self
    }

    // --- storage ---

    pub fn storage_database(mut self, path: PathBuf) -> Self {
        self.config.storage.database = path;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
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
