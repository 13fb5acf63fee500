//! Tracing subscriber setup shared by FSQ services
//!
//! `RUST_LOG` takes precedence over the configured level so operators can
//! raise verbosity for one module without editing the config file.

use crate::config::LoggingConfig;
use crate::{Error, Result};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber
///
/// Returns `Ok(false)` when a global subscriber was already installed (the
/// call is then a no-op), `Ok(true)` when this call installed it.
pub fn init_tracing(config: &LoggingConfig) -> Result<bool> {
    let filter = build_filter(config)?;

    let installed = match &config.file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
                .is_ok()
        }
        None => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init()
            .is_ok(),
    };

    Ok(installed)
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    EnvFilter::try_new(&config.level)
        .map_err(|e| Error::Config(format!("Invalid log level '{}': {}", config.level, e)))
}
