//! Bootstrap configuration loading and database path resolution
//!
//! TOML holds bootstrap concerns only: where the database lives, how to log,
//! and the bounds applied to genealogy traces. Every field has a built-in
//! default, so a missing config file is a warning, not a startup failure.
//!
//! # Database path priority
//!
//! 1. Command-line argument (highest priority)
//! 2. `FSQ_DATABASE_PATH` environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable overriding the database location
pub const DATABASE_PATH_ENV: &str = "FSQ_DATABASE_PATH";

/// Environment variable overriding the config file location
pub const CONFIG_PATH_ENV: &str = "FSQ_CONFIG";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Path to SQLite database file (relative or absolute)
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Genealogy trace bounds (optional)
    #[serde(default)]
    pub trace: TraceConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
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

/// Bounds applied to forward/backward lot traces
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceConfig {
    /// Depth used when the caller does not supply one
    #[serde(default = "default_max_depth")]
    pub default_max_depth: u32,

    /// Largest depth a caller may request
    #[serde(default = "default_max_depth_limit")]
    pub max_depth_limit: u32,

    /// Deadline for a single trace, in milliseconds
    #[serde(default = "default_trace_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            default_max_depth: default_max_depth(),
            max_depth_limit: default_max_depth_limit(),
            timeout_ms: default_trace_timeout_ms(),
        }
    }
}

impl TraceConfig {
    /// Trace deadline as a `Duration`
    pub fn timeout(&self) -> Duration {
        crate::time::millis_to_duration(self.timeout_ms)
    }

    /// Reject bounds that would make every trace request invalid
    pub fn validate(&self) -> Result<()> {
        if self.max_depth_limit == 0 {
            return Err(Error::Config("trace.max_depth_limit must be at least 1".to_string()));
        }
        if self.default_max_depth == 0 || self.default_max_depth > self.max_depth_limit {
            return Err(Error::Config(format!(
                "trace.default_max_depth must be between 1 and {} (got {})",
                self.max_depth_limit, self.default_max_depth
            )));
        }
        if self.timeout_ms == 0 {
            return Err(Error::Config("trace.timeout_ms must be positive".to_string()));
        }
        Ok(())
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_depth() -> u32 {
    10
}

fn default_max_depth_limit() -> u32 {
    50
}

fn default_trace_timeout_ms() -> u64 {
    30_000
}

/// Load TOML configuration
///
/// A missing file is not an error: a warning is logged and defaults are used.
/// An unreadable or malformed file is a `Config` error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(
            "Config file {} not found, using built-in defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read config file {}: {}", path.display(), e)))?;

    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse TOML {}: {}", path.display(), e)))?;

    config.trace.validate()?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Write TOML configuration, creating the parent directory if needed
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Failed to serialize TOML: {}", e)))?;

    std::fs::write(path, content)?;
    Ok(())
}

/// Config file location: `FSQ_CONFIG` if set, else `<config dir>/fsq/config.toml`
pub fn default_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return Ok(PathBuf::from(path));
    }

    dirs::config_dir()
        .map(|d| d.join("fsq").join("config.toml"))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
}

/// Resolve the database file path
///
/// See the module docs for the priority order.
pub fn resolve_database_path(cli_arg: Option<&str>, toml_config: &TomlConfig) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(DATABASE_PATH_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = &toml_config.database_path {
        return path.clone();
    }

    // Priority 4: OS-dependent compiled default
    default_database_path()
}

/// OS-dependent default database path
fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("fsq"))
        .unwrap_or_else(|| PathBuf::from("./fsq_data"))
        .join("fsq.db")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_defaults() {
        let trace = TraceConfig::default();
        assert_eq!(trace.default_max_depth, 10);
        assert_eq!(trace.max_depth_limit, 50);
        assert_eq!(trace.timeout(), Duration::from_secs(30));
        assert!(trace.validate().is_ok());
    }

    #[test]
    fn test_trace_validate_rejects_default_above_limit() {
        let trace = TraceConfig {
            default_max_depth: 60,
            ..TraceConfig::default()
        };
        assert!(matches!(trace.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_trace_validate_rejects_zero_timeout() {
        let trace = TraceConfig {
            timeout_ms: 0,
            ..TraceConfig::default()
        };
        assert!(trace.validate().is_err());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: TomlConfig = toml::from_str(
            r#"
            [trace]
            default_max_depth = 5
            "#,
        )
        .unwrap();

        assert!(config.database_path.is_none());
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.trace.default_max_depth, 5);
        assert_eq!(config.trace.max_depth_limit, 50);
    }

    #[test]
    fn test_cli_arg_wins() {
        let config = TomlConfig {
            database_path: Some(PathBuf::from("/from/toml.db")),
            ..TomlConfig::default()
        };
        let path = resolve_database_path(Some("/from/cli.db"), &config);
        assert_eq!(path, PathBuf::from("/from/cli.db"));
    }

    #[test]
    fn test_default_database_path_ends_with_file_name() {
        assert!(default_database_path().ends_with("fsq.db"));
    }
}
