//! TOML Configuration File Support
//!
//! Centralized configuration loading, with an optional TOML file at
//! `~/.config/relay/relay.toml`.
//!
//! # Configuration Priority
//!
//! Values are applied with the following priority (highest first):
//! 1. CLI arguments ([`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! The endpoint is only ever read here. Remembering it between runs is left
//! to whoever writes the file.
//!
//! # Example Configuration
//!
//! ```toml
//! api = "https://example.com/api/generate"
//! system_prompt = "Translate between English and Chinese"
//! event_buffer = 100
//! scroll_delay_ms = 100
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chat::ChatConfig;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
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

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Structure
// =============================================================================

/// Contents of `relay.toml`
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayToml {
    /// Generation endpoint URL
    pub api: Option<String>,

    /// System prompt prepended to every request
    pub system_prompt: Option<String>,

    /// Capacity of the session event channel
    pub event_buffer: Option<usize>,

    /// Delay before surfaces scroll to new content, in milliseconds
    pub scroll_delay_ms: Option<u64>,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Resolved configuration
#[derive(Clone, Debug)]
pub struct RelayConfig {
    /// Generation endpoint URL
    pub api: Option<String>,

    /// System prompt prepended to every request
    pub system_prompt: Option<String>,

    /// Capacity of the session event channel
    pub event_buffer: usize,

    /// Delay before surfaces scroll to new content, in milliseconds
    pub scroll_delay_ms: u64,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Where the highest-priority value came from
    source: ConfigSource,
}

impl Default for RelayConfig {
    fn default() -> Self {
        let chat = ChatConfig::default();
        Self {
            api: None,
            system_prompt: None,
            event_buffer: chat.event_buffer,
            scroll_delay_ms: chat.scroll_delay_ms,
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl RelayConfig {
    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Build the chat configuration
    #[must_use]
    pub fn chat_config(&self) -> ChatConfig {
        ChatConfig {
            endpoint: self.api.clone(),
            system_prompt: self.system_prompt.clone(),
            event_buffer: self.event_buffer,
            scroll_delay_ms: self.scroll_delay_ms,
        }
    }

    /// Check values that would make the chat unusable
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] for a zero event buffer or a
    /// blank endpoint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.event_buffer == 0 {
            return Err(ConfigError::ValidationError(
                "event_buffer must be at least 1".to_string(),
            ));
        }
        if self.api.as_deref().is_some_and(|api| api.trim().is_empty()) {
            return Err(ConfigError::ValidationError(
                "api must not be blank".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/relay/relay.toml` or `~/.config/relay/relay.toml`.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("relay").join("relay.toml"))
}

/// Load configuration from the default path and the environment
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed.
/// A missing config file is not an error (defaults are used).
pub fn load_config() -> Result<RelayConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path and the environment
///
/// Values are not validated here: CLI overrides still apply on top, so call
/// [`RelayConfig::validate`] once they are in.
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<RelayConfig, ConfigError> {
    load_config_with(path, |key| std::env::var(key).ok())
}

/// Load from `path`, resolving environment variables through `lookup`
fn load_config_with(
    path: Option<PathBuf>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<RelayConfig, ConfigError> {
    let mut config = RelayConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: RelayToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, lookup);

    Ok(config)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut RelayConfig, toml: &RelayToml) {
    if toml.api.is_some() {
        config.api.clone_from(&toml.api);
    }
    if toml.system_prompt.is_some() {
        config.system_prompt.clone_from(&toml.system_prompt);
    }
    if let Some(capacity) = toml.event_buffer {
        config.event_buffer = capacity;
    }
    if let Some(delay) = toml.scroll_delay_ms {
        config.scroll_delay_ms = delay;
    }
}

/// Apply environment variable overrides
///
/// `lookup` resolves a variable name; unparseable numbers are ignored.
fn apply_env_config(config: &mut RelayConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(api) = lookup("RELAY_API") {
        config.api = Some(api);
        config.source = ConfigSource::Env;
    }
    if let Some(prompt) = lookup("RELAY_SYSTEM_PROMPT") {
        config.system_prompt = Some(prompt);
        config.source = ConfigSource::Env;
    }
    if let Some(capacity) = lookup("RELAY_EVENT_BUFFER") {
        if let Ok(n) = capacity.parse::<usize>() {
            config.event_buffer = n;
            config.source = ConfigSource::Env;
        }
    }
    if let Some(delay) = lookup("RELAY_SCROLL_DELAY_MS") {
        if let Ok(ms) = delay.parse::<u64>() {
            config.scroll_delay_ms = ms;
            config.source = ConfigSource::Env;
        }
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Command-line overrides, applied after [`load_config`]
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Endpoint override
    pub api: Option<String>,

    /// System prompt override
    pub system_prompt: Option<String>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set endpoint override
    #[must_use]
    pub fn with_api(mut self, api: String) -> Self {
        self.api = Some(api);
        self
    }

    /// Set system prompt override
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: String) -> Self {
        self.system_prompt = Some(prompt);
        self
    }

    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut RelayConfig) {
        if self.api.is_some() || self.system_prompt.is_some() {
            config.source = ConfigSource::Cli;
        }
        if let Some(ref api) = self.api {
            config.api = Some(api.clone());
        }
        if let Some(ref prompt) = self.system_prompt {
            config.system_prompt = Some(prompt.clone());
        }
    }
}
