use serde::{Deserialize, Serialize};

/// Main configuration structure for revalidate
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Cache behaviour and storage backend
    #[serde(default)]
    pub cache: CacheConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where cache entries live
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Process-local map, lost on restart
    #[default]
    Memory,
    /// `SQLite` file, survives restarts
    Sqlite,
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CacheConfig {
    /// Global switch; when false every call goes straight to the fetch
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Storage backend
    #[serde(default)]
    pub backend: StoreBackend,

    /// Path to the `SQLite` file (sqlite backend only)
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: String,

    /// Maximum number of pooled `SQLite` connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

const fn default_enabled() -> bool {
    true
}

fn default_sqlite_path() -> String {
    ".revalidate/cache.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            backend: StoreBackend::default(),
            sqlite_path: default_sqlite_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stdout only when unset
    #[serde(default)]
    pub log_dir: Option<String>,

    /// Rotation for file logs: daily, hourly or never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}
