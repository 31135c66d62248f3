//! Configuration management for contact-sync
//!
//! This module handles loading, parsing, and validating application configuration
//! from YAML files and environment variables.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Remote mailing-list API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Source files and scheduling
    #[serde(default)]
    pub sync: SyncConfig,

    /// Apply phase tuning
    #[serde(default)]
    pub apply: ApplyConfig,

    /// Report file configuration
    #[serde(default)]
    pub report: ReportConfig,

    /// Failure notification configuration
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileRead(format!("Failed to read config file: {}", e)))?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(yaml);
        serde_yaml::from_str(&expanded)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse YAML: {}", e)))
    }

    /// Load configuration from environment variables with prefix CONTACT_SYNC_
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Ok(url) = std::env::var("CONTACT_SYNC_API_BASE_URL") {
            config.api.base_url = url;
        }
        if let Ok(token) = std::env::var("CONTACT_SYNC_API_TOKEN") {
            config.api.token = Some(token);
        }

        if let Ok(dir) = std::env::var("CONTACT_SYNC_CSV_DIR") {
            config.sync.csv_dir = dir;
        }
        if let Ok(path) = std::env::var("CONTACT_SYNC_LISTS_FILE") {
            config.sync.lists_file = Some(path);
        }
        if let Ok(path) = std::env::var("CONTACT_SYNC_HASH_FILE") {
            config.sync.hash_file = path;
        }
        if let Ok(interval) = std::env::var("CONTACT_SYNC_INTERVAL_SECS") {
            config.sync.interval_secs = interval
                .parse()
                .map_err(|_| ConfigError::Parse("Invalid sync interval".to_string()))?;
        }

        if let Ok(dir) = std::env::var("CONTACT_SYNC_LOG_DIR") {
            config.report.log_dir = dir;
        }
        if let Ok(url) = std::env::var("CONTACT_SYNC_WEBHOOK_URL") {
            config.notify.webhook_url = Some(url);
        }
        if let Ok(level) = std::env::var("CONTACT_SYNC_LOG_LEVEL") {
            config.logging.level = level;
        }

        Ok(config)
    }

    /// Reject settings the sync engine cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.api.token.as_deref() {
            None => return Err(ConfigError::MissingRequired("api.token".to_string())),
            Some(token) if token.is_empty() || token.starts_with("${") => {
                return Err(ConfigError::MissingRequired("api.token".to_string()))
            }
            Some(_) => {}
        }
        if self.apply.concurrency == 0 {
            return Err(ConfigError::InvalidValue(
                "apply.concurrency must be at least 1".to_string(),
            ));
        }
        if self.apply.max_attempts == 0 {
            return Err(ConfigError::InvalidValue(
                "apply.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.api.fetch_attempts == 0 {
            return Err(ConfigError::InvalidValue(
                "api.fetch_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Remote mailing-list API configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiConfig {
    /// Base URL of the v3 API, without trailing slash
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API token sent as `x-api-token`
    pub token: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Attempts at fetching a list's remote contacts
    #[serde(default = "default_fetch_attempts")]
    pub fetch_attempts: u32,

    /// Delay between fetch attempts in milliseconds
    #[serde(default = "default_retry_delay")]
    pub fetch_retry_delay_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            timeout_secs: default_timeout(),
            fetch_attempts: default_fetch_attempts(),
            fetch_retry_delay_ms: default_retry_delay(),
        }
    }
}

fn default_base_url() -> String {
    "https://byui.az1.qualtrics.com/API/v3".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_fetch_attempts() -> u32 {
    2
}

/// One mailing list to keep in sync
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MailingListConfig {
    /// Remote mailing list identifier
    #[serde(alias = "MailingListID")]
    pub mailing_list_id: String,

    /// Source CSV file name, relative to `sync.csv_dir`
    pub csv: String,
}

/// Source files and scheduling
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncConfig {
    /// Directory holding the CSV extracts
    #[serde(default = "default_csv_dir")]
    pub csv_dir: String,

    /// Mailing lists declared inline
    #[serde(default)]
    pub lists: Vec<MailingListConfig>,

    /// Optional CSV file with `MailingListID,csv` rows, read at the start of every run
    #[serde(default)]
    pub lists_file: Option<String>,

    /// JSON file holding the last synced content hash per list
    #[serde(default = "default_hash_file")]
    pub hash_file: String,

    /// Column holding the unique business key
    #[serde(default = "default_unique_id_column")]
    pub unique_id_column: String,

    /// Seconds between runs
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Delay before the first run
    #[serde(default)]
    pub initial_delay_secs: u64,

    /// Random delay added to each scheduled run
    #[serde(default)]
    pub jitter_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            csv_dir: default_csv_dir(),
            lists: Vec::new(),
            lists_file: None,
            hash_file: default_hash_file(),
            unique_id_column: default_unique_id_column(),
            interval_secs: default_interval(),
            initial_delay_secs: 0,
            jitter_secs: 0,
        }
    }
}

fn default_csv_dir() -> String {
    "./csv".to_string()
}

fn default_hash_file() -> String {
    "./hashes.json".to_string()
}

fn default_unique_id_column() -> String {
    "UniqueID".to_string()
}

fn default_interval() -> u64 {
    86400 // 24 hours
}

/// Apply phase tuning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApplyConfig {
    /// Remote calls in flight at once within an action group
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Attempts per contact operation
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed delay between attempts in milliseconds
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
}

impl Default for ApplyConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay(),
        }
    }
}

fn default_concurrency() -> usize {
    5
}

fn default_max_attempts() -> u32 {
    2
}

fn default_retry_delay() -> u64 {
    2500
}

/// Report file configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportConfig {
    /// Directory for `log.txt` and detailed reports
    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    /// Whether to write a per-list JSON report
    #[serde(default)]
    pub detailed: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            detailed: false,
        }
    }
}

fn default_log_dir() -> String {
    "./logs".to_string()
}

/// Failure notification configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NotifyConfig {
    /// Webhook receiving the run summary when anything failed
    #[serde(default)]
    pub webhook_url: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (`json` or `pretty`)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

/// Configuration error types
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum ConfigError {
    /// Error reading configuration file
    #[error("Failed to read configuration file: {0}")]
    FileRead(String),

    /// Error parsing configuration
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    /// Invalid configuration value
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// Missing required configuration
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

/// Expand environment variables in a string
///
/// Supports `${VAR_NAME}` syntax
fn expand_env_vars(input: &str) -> String {
    let re = regex_lite::Regex::new(r"\$\{([^}]+)\}")
        .expect("Invalid regex pattern for environment variable expansion");

    re.replace_all(input, |caps: &regex_lite::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| caps[0].to_string())
    })
    .into_owned()
}
