//! Configuration loading
//!
//! Settings sources, highest priority first:
//! 1. Command-line arguments (`--config`, `--origin`)
//! 2. Environment variables (`CHATMEDIA_CONFIG`, `CHATMEDIA_BACKEND_ORIGIN`)
//! 3. TOML config file (`<config dir>/chatmedia/config.toml`)
//! 4. Compiled defaults
//!
//! A missing config file is not fatal: a warning is logged and defaults are
//! used. A file that exists but does not parse or validate is an error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "CHATMEDIA_CONFIG";

/// Environment variable overriding the backend origin
pub const ORIGIN_ENV_VAR: &str = "CHATMEDIA_BACKEND_ORIGIN";

/// Local retries before a controller offers the alternate locator
pub const DEFAULT_MAX_LOCAL_RETRIES: u32 = 3;

/// Configuration loaded from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Origin every backend endpoint template is joined onto
    #[serde(default = "default_backend_origin")]
    pub backend_origin: String,

    /// Origin of the media provider's CDN (optional)
    #[serde(default)]
    pub provider_origin: Option<String>,

    /// Load errors tolerated per candidate before escalation
    #[serde(default = "default_max_local_retries")]
    pub max_local_retries: u32,

    /// Per-subscriber buffer of the failure channel
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_backend_origin() -> String {
    "http://localhost:8080".to_string()
}

fn default_max_local_retries() -> u32 {
    DEFAULT_MAX_LOCAL_RETRIES
}

fn default_channel_capacity() -> usize {
    64
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            backend_origin: default_backend_origin(),
            provider_origin: None,
            max_local_retries: default_max_local_retries(),
            channel_capacity: default_channel_capacity(),
            logging: LoggingConfig::default(),
        }
    }
}

impl TomlConfig {
    /// Parse and validate TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(text)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Check origins are absolute http(s) addresses and limits are positive
    pub fn validate(&self) -> Result<()> {
        validate_origin("backend_origin", &self.backend_origin)?;
        if let Some(provider) = &self.provider_origin {
            validate_origin("provider_origin", provider)?;
        }
        if self.max_local_retries == 0 {
            return Err(Error::Config(
                "max_local_retries must be at least 1".to_string(),
            ));
        }
        if self.channel_capacity == 0 {
            return Err(Error::Config(
                "channel_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn validate_origin(field: &str, value: &str) -> Result<()> {
    let parsed = url::Url::parse(value)
        .map_err(|e| Error::Config(format!("{} '{}' is not a valid URL: {}", field, value, e)))?;
    match parsed.scheme() {
        "http" | "https" if parsed.host().is_some() => Ok(()),
        _ => Err(Error::Config(format!(
            "{} '{}' must be an absolute http(s) origin",
            field, value
        ))),
    }
}

/// Default config file location for the platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("chatmedia").join("config.toml"))
}

/// Pick the config file to read
///
/// Command-line path, then `CHATMEDIA_CONFIG`, then the platform default if
/// it exists.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config file, only when present
    default_config_path().filter(|p| p.exists())
}

/// Load the effective configuration
///
/// `cli_origin` overrides the backend origin from every other source.
pub fn load_config(cli_path: Option<&Path>, cli_origin: Option<&str>) -> Result<TomlConfig> {
    let mut config = match resolve_config_path(cli_path) {
        Some(path) if path.exists() => {
            let config = TomlConfig::load(&path)?;
            info!("Loaded configuration from {:?}", path);
            config
        }
        Some(path) => {
            warn!("Config file {:?} not found, using defaults", path);
            TomlConfig::default()
        }
        None => TomlConfig::default(),
    };

    if let Some(origin) = cli_origin {
        config.backend_origin = origin.to_string();
    } else if let Ok(origin) = std::env::var(ORIGIN_ENV_VAR) {
        if !origin.trim().is_empty() {
            config.backend_origin = origin;
        }
    }

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TomlConfig::default();
        assert_eq!(config.max_local_retries, 3);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = TomlConfig::from_toml_str("backend_origin = \"https://chat.example.com\"\n")
            .expect("valid config");
        assert_eq!(config.backend_origin, "https://chat.example.com");
        assert_eq!(config.channel_capacity, 64);
        assert!(config.provider_origin.is_none());
    }

    #[test]
    fn test_relative_origin_rejected() {
        let err = TomlConfig::from_toml_str("backend_origin = \"/api\"\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_non_http_origin_rejected() {
        let err = TomlConfig::from_toml_str("backend_origin = \"ftp://files.example.com\"\n")
            .unwrap_err();
        assert!(err.to_string().contains("http(s)"));
    }

    #[test]
    fn test_zero_retries_rejected() {
        let err = TomlConfig::from_toml_str("max_local_retries = 0\n").unwrap_err();
        assert!(err.to_string().contains("max_local_retries"));
    }
}
