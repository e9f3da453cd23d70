//! Bootstrap configuration loading
//!
//! Settings are resolved in priority order:
//! 1. Command-line argument (highest priority, applied by the binary)
//! 2. Environment variable (applied by the binary through clap)
//! 3. TOML config file
//! 4. Built-in defaults

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "DEBTFEED_CONFIG";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    /// SQLite database file. Defaults to the platform data directory.
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Address the HTTP server binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub ingest: IngestSettings,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            bind_address: default_bind_address(),
            port: default_port(),
            logging: LoggingConfig::default(),
            ingest: IngestSettings::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// EnvFilter directive (e.g. "info", "debtfeed_ingest=debug")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Tunables for the ingestion pipeline and background task queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSettings {
    /// Number of new debts accumulated before a bulk insert
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Attempts per background task before it is dead-lettered
    #[serde(default = "default_task_max_attempts")]
    pub task_max_attempts: u32,

    /// Initial retry delay for failed tasks, doubled per attempt
    #[serde(default = "default_task_retry_backoff_ms")]
    pub task_retry_backoff_ms: u64,

    /// Maximum total time to retry a write on `database is locked`
    #[serde(default = "default_lock_wait_ms")]
    pub lock_wait_ms: u64,

    /// Upper bound on accepted upload size
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            task_max_attempts: default_task_max_attempts(),
            task_retry_backoff_ms: default_task_retry_backoff_ms(),
            lock_wait_ms: default_lock_wait_ms(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl IngestSettings {
    /// Reject values that would stall or break the pipeline
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::Config("ingest.batch_size must be greater than 0".to_string()));
        }
        if self.task_max_attempts == 0 {
            return Err(Error::Config(
                "ingest.task_max_attempts must be greater than 0".to_string(),
            ));
        }
        if self.max_upload_bytes == 0 {
            return Err(Error::Config(
                "ingest.max_upload_bytes must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5780
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_batch_size() -> usize {
    2000
}

fn default_task_max_attempts() -> u32 {
    3
}

fn default_task_retry_backoff_ms() -> u64 {
    200
}

fn default_lock_wait_ms() -> u64 {
    5000
}

fn default_max_upload_bytes() -> usize {
    50 * 1024 * 1024
}

/// Parse a TOML config file and validate it
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
    config.ingest.validate()?;
    Ok(config)
}

/// Write a config file, creating the parent directory if needed
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize config failed: {}", e)))?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Find the config file to load
///
/// An explicit path (CLI or `DEBTFEED_CONFIG`) must exist. Otherwise the user
/// config directory and then `/etc/debtfeed` are probed; `None` means run on
/// defaults.
pub fn locate_config_file(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(Error::Config(format!("Config file not found: {}", path.display())));
        }
        return Ok(Some(path.to_path_buf()));
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        let path = PathBuf::from(path);
        if !path.exists() {
            return Err(Error::Config(format!("Config file not found: {}", path.display())));
        }
        return Ok(Some(path));
    }

    let user_config = dirs::config_dir().map(|d| d.join("debtfeed").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Ok(Some(path));
        }
    }

    let system_config = PathBuf::from("/etc/debtfeed/config.toml");
    if system_config.exists() {
        return Ok(Some(system_config));
    }

    Ok(None)
}

/// Load configuration from the located file, or defaults when there is none
pub fn load_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    match locate_config_file(explicit)? {
        Some(path) => load_toml_config(&path),
        None => Ok(TomlConfig::default()),
    }
}

/// OS-dependent default database location
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("debtfeed"))
        .unwrap_or_else(|| PathBuf::from("./debtfeed_data"))
        .join("debtfeed.db")
}
