//! Client configuration.
//!
//! Stored as JSON in the platform config directory:
//! - Linux: `~/.config/reflect/config.json`
//! - macOS: `~/Library/Application Support/reflect/config.json`
//! - Windows: `%APPDATA%\reflect\config\config.json`
//!
//! The backend URL can be overridden per process with `REFLECT_API_URL`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::api::DEFAULT_BASE_URL;
use crate::logging::APP_NAME;

/// Environment variable overriding the configured backend URL.
pub const API_URL_ENV: &str = "REFLECT_API_URL";

/// Error type for configuration storage.
#[derive(Debug)]
pub enum ConfigError {
    /// No home directory to derive the config location from
    NoConfigDir,
    Io(std::io::Error),
    Serialize(String),
    /// URL is not http(s)
    InvalidUrl(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NoConfigDir => write!(f, "Could not determine config directory"),
            ConfigError::Io(e) => write!(f, "Config file error: {}", e),
            ConfigError::Serialize(e) => write!(f, "Failed to serialize config: {}", e),
            ConfigError::InvalidUrl(url) => {
                write!(f, "Invalid backend URL '{}' (expected http:// or https://)", url)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

fn default_api_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_poll_interval() -> u64 {
    10
}

fn default_status_timeout() -> u64 {
    3
}

fn default_language() -> String {
    "en".to_string()
}

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Backend base URL.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Seconds between status probes in watch mode.
    #[serde(default = "default_poll_interval")]
    pub status_poll_interval_secs: u64,

    /// Seconds before a status probe counts as failed.
    #[serde(default = "default_status_timeout")]
    pub status_timeout_secs: u64,

    /// Language sent with uploads and text entries.
    #[serde(default = "default_language")]
    pub default_language: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            status_poll_interval_secs: default_poll_interval(),
            status_timeout_secs: default_status_timeout(),
            default_language: default_language(),
        }
    }
}

impl ClientConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.status_poll_interval_secs.max(1))
    }

    pub fn status_timeout(&self) -> Duration {
        Duration::from_secs(self.status_timeout_secs.max(1))
    }

    /// Set the backend URL after checking its scheme.
    pub fn set_api_url(&mut self, url: &str) -> Result<(), ConfigError> {
        self.api_base_url = validate_url(url)?;
        Ok(())
    }
}

fn validate_url(url: &str) -> Result<String, ConfigError> {
    let trimmed = url.trim().trim_end_matches('/');
    let host = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"));
    match host {
        Some(h) if !h.is_empty() => Ok(trimmed.to_string()),
        _ => Err(ConfigError::InvalidUrl(url.to_string())),
    }
}

/// Path of the config file.
pub fn get_config_path() -> Result<PathBuf, ConfigError> {
    let dirs = ProjectDirs::from("", "", APP_NAME).ok_or(ConfigError::NoConfigDir)?;
    Ok(dirs.config_dir().join("config.json"))
}

/// Load from `path`, falling back to defaults when the file is missing or
/// unreadable. Unknown fields are ignored and missing ones defaulted.
pub fn load_config_from(path: &Path) -> ClientConfig {
    if !path.exists() {
        debug!(path = %path.display(), "No config file found, using defaults");
        return ClientConfig::default();
    }

    match fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str::<ClientConfig>(&contents) {
            Ok(config) => {
                debug!(path = %path.display(), "Loaded config");
                config
            }
            Err(e) => {
                warn!(error = %e, "Failed to parse config file, using defaults");
                ClientConfig::default()
            }
        },
        Err(e) => {
            warn!(error = %e, "Failed to read config file, using defaults");
            ClientConfig::default()
        }
    }
}

/// Load from the platform config path.
pub fn load_config() -> ClientConfig {
    match get_config_path() {
        Ok(path) => load_config_from(&path),
        Err(e) => {
            warn!(error = %e, "Using default config");
            ClientConfig::default()
        }
    }
}

pub fn save_config_to(config: &ClientConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json =
        serde_json::to_string_pretty(config).map_err(|e| ConfigError::Serialize(e.to_string()))?;
    fs::write(path, json)?;
    info!(path = %path.display(), "Saved config");
    Ok(())
}

pub fn save_config(config: &ClientConfig) -> Result<PathBuf, ConfigError> {
    let path = get_config_path()?;
    save_config_to(config, &path)?;
    Ok(path)
}

/// Backend URL in priority order: explicit flag, environment, config file.
pub fn resolve_base_url(
    flag: Option<&str>,
    env: Option<&str>,
    config: &ClientConfig,
) -> Result<String, ConfigError> {
    if let Some(url) = flag.filter(|u| !u.trim().is_empty()) {
        return validate_url(url);
    }
    if let Some(url) = env.filter(|u| !u.trim().is_empty()) {
        return validate_url(url);
    }
    validate_url(&config.api_base_url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.api_base_url, "http://127.0.0.1:8000");
        assert_eq!(config.poll_interval(), Duration::from_secs(10));
        assert_eq!(config.status_timeout(), Duration::from_secs(3));
        assert_eq!(config.default_language, "en");
    }

    #[test]
    fn test_backward_compatible_parse() {
        let json = r#"{"api_base_url": "http://10.0.0.2:9000", "legacy_field": true}"#;
        let config: ClientConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.api_base_url, "http://10.0.0.2:9000");
        assert_eq!(config.status_poll_interval_secs, 10);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = ClientConfig::default();
        config.set_api_url("http://192.168.1.5:8000/").unwrap();
        config.default_language = "nl".into();
        save_config_to(&config, &path).unwrap();

        let loaded = load_config_from(&path);
        assert_eq!(loaded, config);
        assert_eq!(loaded.api_base_url, "http://192.168.1.5:8000");
    }

    #[test]
    fn test_corrupt_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();
        assert_eq!(load_config_from(&path), ClientConfig::default());
        assert_eq!(
            load_config_from(&dir.path().join("missing.json")),
            ClientConfig::default()
        );
    }

    #[test]
    fn test_resolve_priority() {
        let config = ClientConfig::default();
        assert_eq!(
            resolve_base_url(Some("http://flag:1"), Some("http://env:2"), &config).unwrap(),
            "http://flag:1"
        );
        assert_eq!(
            resolve_base_url(None, Some("http://env:2"), &config).unwrap(),
            "http://env:2"
        );
        assert_eq!(
            resolve_base_url(None, Some(" "), &config).unwrap(),
            DEFAULT_BASE_URL
        );
        assert!(resolve_base_url(Some("ftp://x"), None, &config).is_err());
    }

    #[test]
    fn test_set_api_url_rejects_garbage() {
        let mut config = ClientConfig::default();
        assert!(config.set_api_url("localhost:8000").is_err());
        assert!(config.set_api_url("http://").is_err());
        assert_eq!(config.api_base_url, DEFAULT_BASE_URL);
    }
}
