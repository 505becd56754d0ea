//! Configuration
//!
//! Centralized configuration loading for the engine, supporting a TOML file
//! at `~/.config/postmuse/config.toml`.
//!
//! # Configuration Priority
//!
//! Values are resolved with the following priority (highest first):
//! 1. Environment variables (`POSTMUSE_*`)
//! 2. TOML configuration file
//! 3. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [endpoint]
//! url = "https://example.com/api/chat"
//! api_key = "sk-..."
//! connect_timeout_ms = 5000
//!
//! [chat]
//! system_prompt = "You are a social media content assistant."
//! max_history_messages = 0
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Endpoint section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointToml {
    /// Completion endpoint URL
    pub url: Option<String>,

    /// Bearer token sent with each request
    pub api_key: Option<String>,

    /// Connect timeout in milliseconds
    pub connect_timeout_ms: Option<u64>,
}

/// Chat section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatToml {
    /// System prompt prepended to every request
    pub system_prompt: Option<String>,

    /// Maximum history messages sent per request (0 = all)
    pub max_history_messages: Option<usize>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigToml {
    /// Endpoint configuration section
    pub endpoint: EndpointToml,

    /// Chat configuration section
    pub chat: ChatToml,
}

/// Resolved endpoint configuration
#[derive(Clone, Debug)]
pub struct EndpointConfig {
    /// Completion endpoint URL (no default - the client is useless without
    /// one, and the engine reports it at startup)
    pub url: Option<String>,
    /// Bearer token sent with each request
    pub api_key: Option<String>,
    /// Connect timeout in milliseconds
    pub connect_timeout_ms: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            connect_timeout_ms: 5000,
        }
    }
}

/// Resolved engine configuration
#[derive(Clone, Debug, Default)]
pub struct EngineConfig {
    /// Completion endpoint settings
    pub endpoint: EndpointConfig,
    /// System prompt prepended to every request
    pub system_prompt: Option<String>,
    /// Maximum history messages sent per request (0 = all)
    pub max_history_messages: usize,
}

impl EngineConfig {
    /// Create configuration from environment variables only
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Overlay values from a parsed TOML file
    #[must_use]
    pub fn with_file(mut self, file: &ConfigToml) -> Self {
        if let Some(ref url) = file.endpoint.url {
            self.endpoint.url = Some(url.clone());
        }
        if let Some(ref api_key) = file.endpoint.api_key {
            self.endpoint.api_key = Some(api_key.clone());
        }
        if let Some(timeout) = file.endpoint.connect_timeout_ms {
            self.endpoint.connect_timeout_ms = timeout;
        }
        if let Some(ref system_prompt) = file.chat.system_prompt {
            self.system_prompt = Some(system_prompt.clone());
        }
        if let Some(max) = file.chat.max_history_messages {
            self.max_history_messages = max;
        }
        self
    }

    /// Overlay values from `POSTMUSE_*` environment variables
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(url) = std::env::var("POSTMUSE_ENDPOINT")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
        {
            self.endpoint.url = Some(url);
        }
        if let Some(api_key) = std::env::var("POSTMUSE_API_KEY")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
        {
            self.endpoint.api_key = Some(api_key);
        }
        if let Some(timeout) = std::env::var("POSTMUSE_CONNECT_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.endpoint.connect_timeout_ms = timeout;
        }
        if let Ok(system_prompt) = std::env::var("POSTMUSE_SYSTEM_PROMPT") {
            self.system_prompt = Some(system_prompt);
        }
        if let Some(max) = std::env::var("POSTMUSE_MAX_HISTORY")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.max_history_messages = max;
        }
        self
    }
}

/// Default config file path per XDG base directories
///
/// Typically `~/.config/postmuse/config.toml`.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("postmuse").join("config.toml"))
}

/// Load configuration with file + environment layering
///
/// The file path comes from `POSTMUSE_CONFIG` or the XDG default. A missing
/// file is not an error - defaults apply; an unreadable or unparsable file
/// is.
pub fn load_config() -> Result<EngineConfig, ConfigError> {
    let path = std::env::var("POSTMUSE_CONFIG")
        .ok()
        .map(PathBuf::from)
        .or_else(default_config_path);

    let mut config = EngineConfig::default();

    if let Some(path) = path {
        if path.exists() {
            config = load_file_into(config, &path)?;
            tracing::debug!(path = %path.display(), "loaded config file");
        } else {
            tracing::debug!(path = %path.display(), "no config file; using defaults");
        }
    }

    Ok(config.with_env_overrides())
}

/// Load configuration from a specific file path (missing file is an error)
pub fn load_config_from_path(path: &Path) -> Result<EngineConfig, ConfigError> {
    let config = load_file_into(EngineConfig::default(), path)?;
    Ok(config.with_env_overrides())
}

fn load_file_into(config: EngineConfig, path: &Path) -> Result<EngineConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;
    let file: ConfigToml = toml::from_str(&contents)?;
    Ok(config.with_file(&file))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert!(config.endpoint.url.is_none());
        assert!(config.endpoint.api_key.is_none());
        assert_eq!(config.endpoint.connect_timeout_ms, 5000);
        assert!(config.system_prompt.is_none());
        assert_eq!(config.max_history_messages, 0);
    }

    #[test]
    fn test_file_overlay() {
        let file: ConfigToml = toml::from_str(
            r#"
            [endpoint]
            url = "https://example.com/api/chat"
            connect_timeout_ms = 1000

            [chat]
            system_prompt = "be brief"
            "#,
        )
        .unwrap();

        let config = EngineConfig::default().with_file(&file);
        assert_eq!(
            config.endpoint.url.as_deref(),
            Some("https://example.com/api/chat")
        );
        assert_eq!(config.endpoint.connect_timeout_ms, 1000);
        assert_eq!(config.system_prompt.as_deref(), Some("be brief"));
        // Untouched values keep their defaults.
        assert!(config.endpoint.api_key.is_none());
        assert_eq!(config.max_history_messages, 0);
    }

    #[test]
    fn test_empty_file_keeps_defaults() {
        let file: ConfigToml = toml::from_str("").unwrap();
        let config = EngineConfig::default().with_file(&file);
        assert_eq!(config.endpoint.connect_timeout_ms, 5000);
    }

    #[test]
    fn test_malformed_file_is_a_parse_error() {
        let result: Result<ConfigToml, _> = toml::from_str("endpoint = 3");
        assert!(result.is_err());
    }
}
