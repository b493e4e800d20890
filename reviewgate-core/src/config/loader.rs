//! Configuration file loading.
//!
//! Files are JSON documents deserialized into [`GatewayConfig`]. Missing
//! sections and fields take their defaults, then environment overrides are
//! applied and the result is validated.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::GatewayConfig;
use super::error::ConfigError;

/// Environment variable naming a config file when no explicit path is given.
pub const CONFIG_PATH_ENV: &str = "REVIEWGATE_CONFIG";

/// Load, override and validate configuration from a file path.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::ConfigFileNotFound {
            path: path.to_path_buf(),
        });
    }

    let contents = std::fs::read_to_string(path)?;
    if contents.trim().is_empty() {
        return Err(ConfigError::EmptyConfigFile);
    }

    let mut config: GatewayConfig = serde_json::from_str(&contents)?;
    config.apply_env();
    config.validate()?;

    info!(path = %path.display(), "Loaded configuration");
    Ok(config)
}

/// Load configuration from `explicit`, then `$REVIEWGATE_CONFIG`, else defaults.
///
/// An explicit path that does not exist is an error. Defaults still get
/// environment overrides and validation.
pub fn load_or_default(explicit: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    if let Some(path) = explicit {
        return load_config(path);
    }

    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return load_config(&PathBuf::from(path));
    }

    debug!("No config file given, using defaults");
    let mut config = GatewayConfig::default();
    config.apply_env();
    config.validate()?;
    Ok(config)
}
