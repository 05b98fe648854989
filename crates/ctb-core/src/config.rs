//! Configuration system for cassandra-toolbox
//!
//! Provides:
//! - Config file discovery (CLI flag, env var, standard paths)
//! - TOML parsing with serde
//! - Environment variable overrides
//! - Validation of thresholds, stat polling, and extra flag patterns

use crate::encoding::TimestampEncoding;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Flag names accepted in `[tracing.flag_patterns]`
///
/// Must list `ctb_trace::Flag::name()` for every `Flag::ALL` entry, in order.
pub const FLAG_NAMES: [&str; 3] = ["read_repair", "timeout", "index_used"];

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Complete toolbox configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolboxConfig {
    /// Logging settings
    pub logging: LoggingSettings,

    /// Trace analysis settings
    pub tracing: TracingSettings,

    /// Real-time stat poller settings
    pub stat: StatSettings,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

/// Trace analysis settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TracingSettings {
    /// Minimum total tombstones for a session to qualify
    pub tombstone_threshold: u64,

    /// Minimum session duration in microseconds
    pub time_threshold_us: u64,

    /// Maximum sessions to report (0 = unlimited)
    pub result_cap: usize,

    /// Timestamp encoding used by the backend
    pub timestamp_encoding: TimestampEncoding,

    /// Events for one session are stored contiguously
    pub partition_locality: bool,

    /// Request column width in the text report
    pub request_width: usize,

    /// Output format: text, json
    pub format: String,

    /// Extra classifier patterns by flag name
    pub flag_patterns: BTreeMap<String, Vec<String>>,
}

impl Default for TracingSettings {
    fn default() -> Self {
        Self {
            tombstone_threshold: 0,
            time_threshold_us: 10_000,
            result_cap: 100,
            timestamp_encoding: TimestampEncoding::Native,
            partition_locality: false,
            request_width: 60,
            format: "text".to_string(),
            flag_patterns: BTreeMap::new(),
        }
    }
}

/// Stat poller settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatSettings {
    /// Jolokia agent base URL
    pub host: String,

    /// Polls between header lines (0 = first only, -1 = never)
    pub header_rows: i64,

    /// Seconds between polls
    pub rate_secs: u64,

    /// Include system keyspaces
    pub show_system: bool,

    /// Show keyspace level rows
    pub show_keyspace: bool,

    /// Show keyspace.table level rows
    pub show_cfs: bool,

    /// Show namespaces with no activity
    pub show_zeros: bool,

    /// Show the aggregated total row
    pub show_total: bool,

    /// Restrict output to these keyspaces or keyspace.table names
    pub namespaces: Vec<String>,

    /// Keyspaces treated as system keyspaces
    pub system_keyspaces: Vec<String>,

    /// HTTP request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for StatSettings {
    fn default() -> Self {
        Self {
            host: "http://localhost:8778".to_string(),
            header_rows: 10,
            rate_secs: 1,
            show_system: false,
            show_keyspace: false,
            show_cfs: false,
            show_zeros: false,
            show_total: true,
            namespaces: Vec::new(),
            system_keyspaces: vec![
                "system".to_string(),
                "system_keyspaces".to_string(),
                "system_auth".to_string(),
            ],
            timeout_secs: 10,
        }
    }
}

/// Configuration loader
pub struct ConfigLoader {
    /// Path to config file (if specified via CLI)
    cli_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new config loader
    pub fn new() -> Self {
        Self { cli_path: None }
    }

    /// Set the config path from CLI argument
    pub fn with_cli_path(mut self, path: Option<PathBuf>) -> Self {
        self.cli_path = path;
        self
    }

    /// Load configuration with the following precedence:
    /// 1. CLI --config flag
    /// 2. CTB_CONFIG environment variable
    /// 3. ~/.config/cassandra-toolbox/config.toml
    /// 4. /etc/cassandra-toolbox/config.toml
    /// 5. Default values
    pub fn load(&self) -> ConfigResult<ToolboxConfig> {
        let mut config = match self.find_config_file()? {
            Some(path) => {
                info!("Loading configuration from: {}", path.display());
                self.load_from_file(&path)?
            }
            None => {
                debug!("No config file found, using defaults");
                ToolboxConfig::default()
            }
        };

        self.apply_env_overrides(&mut config);
        self.validate(&config)?;

        Ok(config)
    }

    /// Find the config file to use
    fn find_config_file(&self) -> ConfigResult<Option<PathBuf>> {
        // An explicit --config must exist
        if let Some(path) = &self.cli_path {
            if path.exists() {
                return Ok(Some(path.clone()));
            }
            return Err(ConfigError::NotFound(path.clone()));
        }

        if let Ok(env_path) = std::env::var("CTB_CONFIG") {
            let path = PathBuf::from(&env_path);
            if path.exists() {
                return Ok(Some(path));
            }
            warn!("CTB_CONFIG path does not exist: {}", env_path);
        }

        if let Some(path) = Self::default_config_path() {
            if path.exists() {
                return Ok(Some(path));
            }
        }

        #[cfg(unix)]
        {
            let path = PathBuf::from("/etc/cassandra-toolbox/config.toml");
            if path.exists() {
                return Ok(Some(path));
            }
        }

        Ok(None)
    }

    /// Load configuration from a TOML file
    fn load_from_file(&self, path: &Path) -> ConfigResult<ToolboxConfig> {
        let content = std::fs::read_to_string(path)?;
        let config: ToolboxConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&self, config: &mut ToolboxConfig) {
        if let Ok(val) = std::env::var("CTB_LOG_LEVEL") {
            config.logging.level = val;
        }

        override_parsed(
            "CTB_TOMBSTONE_THRESHOLD",
            &mut config.tracing.tombstone_threshold,
        );
        override_parsed("CTB_TIME_THRESHOLD", &mut config.tracing.time_threshold_us);
        override_parsed("CTB_RESULT_CAP", &mut config.tracing.result_cap);
        override_parsed(
            "CTB_TIMESTAMP_ENCODING",
            &mut config.tracing.timestamp_encoding,
        );

        if let Ok(val) = std::env::var("CTB_JOLOKIA_HOST") {
            config.stat.host = val;
        }
        override_parsed("CTB_STAT_RATE", &mut config.stat.rate_secs);
    }

    /// Validate configuration
    pub fn validate(&self, config: &ToolboxConfig) -> ConfigResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid log level: {}. Must be one of: {:?}",
                config.logging.level, valid_levels
            )));
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&config.tracing.format.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid output format: {}. Must be one of: {:?}",
                config.tracing.format, valid_formats
            )));
        }

        if config.tracing.request_width < 8 {
            return Err(ConfigError::ValidationError(format!(
                "Request width must be at least 8, got {}",
                config.tracing.request_width
            )));
        }

        for (flag, patterns) in &config.tracing.flag_patterns {
            if !FLAG_NAMES.contains(&flag.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "Unknown flag in flag_patterns: {}. Must be one of: {:?}",
                    flag, FLAG_NAMES
                )));
            }
            for pattern in patterns {
                if let Err(e) = Regex::new(pattern) {
                    return Err(ConfigError::ValidationError(format!(
                        "Invalid pattern for {}: {}",
                        flag, e
                    )));
                }
            }
        }

        if config.stat.rate_secs == 0 {
            return Err(ConfigError::ValidationError(
                "Stat rate cannot be 0".to_string(),
            ));
        }

        if config.stat.header_rows < -1 {
            return Err(ConfigError::ValidationError(format!(
                "Header rows must be -1 or greater, got {}",
                config.stat.header_rows
            )));
        }

        if !config.stat.host.starts_with("http://") && !config.stat.host.starts_with("https://")
        {
            return Err(ConfigError::ValidationError(format!(
                "Stat host must be an http(s) URL, got {}",
                config.stat.host
            )));
        }

        Ok(())
    }

    /// Get the default config file path for the current platform
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("cassandra-toolbox").join("config.toml"))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse an env var into `target`, leaving it unchanged on failure
fn override_parsed<T: std::str::FromStr>(var: &str, target: &mut T) {
    if let Ok(val) = std::env::var(var) {
        match val.parse() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!("Ignoring unparseable {}={}", var, val),
        }
    }
}

/// Helper module for platform-specific directories
mod dirs {
    use std::path::PathBuf;

    /// Get the user's config directory
    pub fn config_dir() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            std::env::var("APPDATA").ok().map(PathBuf::from)
        }

        #[cfg(not(target_os = "windows"))]
        {
            std::env::var("XDG_CONFIG_HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|h| PathBuf::from(h).join(".config"))
                })
        }
    }
}
