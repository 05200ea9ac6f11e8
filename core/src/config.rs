//! Client Configuration
//!
//! TOML configuration with environment overrides, loaded from the XDG
//! config dir (`~/.config/tidechat/client.toml`).
//!
//! # Priority
//!
//! 1. Environment variables (`TIDECHAT_SERVER_URL`, `TIDECHAT_WEB_SEARCH`)
//! 2. TOML configuration file
//! 3. Defaults
//!
//! # Example
//!
//! ```toml
//! [server]
//! url = "http://127.0.0.1:5000"
//! request_timeout_secs = 120
//!
//! [search]
//! enabled = true
//!
//! [progress]
//! simulate = true
//! initial_delay_ms = 1000
//! cadence_ms = 3000
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default chat server address (the development server's port).
const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file.
    #[error("Failed to read config file at {path}: {source}")]
    Read {
        /// The path that was attempted.
        path: PathBuf,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("Failed to parse TOML config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Resolved client configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the chat server.
    pub server_url: String,
    /// Whole-request timeout, covering the streamed body.
    pub request_timeout: Duration,
    /// Whether web search starts enabled.
    pub enable_web_search: bool,
    /// Simulated-progress settings.
    pub progress: ProgressConfig,
}

/// Settings for the simulated progress fallback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgressConfig {
    /// Whether to simulate search titles when the server streams none.
    pub simulate: bool,
    /// Delay before the first fabricated title.
    pub initial_delay: Duration,
    /// Interval between fabricated titles.
    pub cadence: Duration,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            simulate: true,
            initial_delay: Duration::from_millis(1000),
            cadence: Duration::from_millis(3000),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            request_timeout: Duration::from_secs(120),
            enable_web_search: true,
            progress: ProgressConfig::default(),
        }
    }
}

// =============================================================================
// TOML file structures
// =============================================================================

/// Top-level TOML layout. All sections and keys are optional.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientToml {
    /// `[server]` section.
    pub server: ServerToml,
    /// `[search]` section.
    pub search: SearchToml,
    /// `[progress]` section.
    pub progress: ProgressToml,
}

/// `[server]` section of the TOML configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerToml {
    /// Base URL of the chat server.
    pub url: Option<String>,
    /// Whole-request timeout in seconds.
    pub request_timeout_secs: Option<u64>,
}

/// `[search]` section of the TOML configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchToml {
    /// Whether web search starts enabled.
    pub enabled: Option<bool>,
}

/// `[progress]` section of the TOML configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressToml {
    /// Whether to simulate search titles.
    pub simulate: Option<bool>,
    /// Delay before the first fabricated title, in milliseconds.
    pub initial_delay_ms: Option<u64>,
    /// Interval between fabricated titles, in milliseconds.
    pub cadence_ms: Option<u64>,
}

impl ClientToml {
    /// Resolve the file values against defaults.
    #[must_use]
    pub fn resolve(self) -> ClientConfig {
        let defaults = ClientConfig::default();
        ClientConfig {
            server_url: self.server.url.unwrap_or(defaults.server_url),
            request_timeout: self
                .server
                .request_timeout_secs
                .map_or(defaults.request_timeout, Duration::from_secs),
            enable_web_search: self.search.enabled.unwrap_or(defaults.enable_web_search),
            progress: ProgressConfig {
                simulate: self
                    .progress
                    .simulate
                    .unwrap_or(defaults.progress.simulate),
                initial_delay: self
                    .progress
                    .initial_delay_ms
                    .map_or(defaults.progress.initial_delay, Duration::from_millis),
                cadence: self
                    .progress
                    .cadence_ms
                    .map_or(defaults.progress.cadence, Duration::from_millis),
            },
        }
    }
}

// =============================================================================
// Loading
// =============================================================================

/// Default configuration file path:
/// `$XDG_CONFIG_HOME/tidechat/client.toml`.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("tidechat").join("client.toml"))
}

/// Load configuration from the default location, applying environment
/// overrides. A missing file is not an error; defaults apply.
pub fn load_config() -> Result<ClientConfig, ConfigError> {
    let config = match default_config_path() {
        Some(path) if path.exists() => load_config_from_path(&path)?,
        _ => ClientConfig::default(),
    };
    Ok(apply_env_overrides(config))
}

/// Load configuration from an explicit path, applying environment
/// overrides. The file must exist.
pub fn load_config_from_path(path: &Path) -> Result<ClientConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed: ClientToml = toml::from_str(&raw)?;
    tracing::debug!(path = %path.display(), "loaded configuration file");
    Ok(parsed.resolve())
}

/// Apply `TIDECHAT_*` environment variables on top of a configuration.
#[must_use]
pub fn apply_env_overrides(mut config: ClientConfig) -> ClientConfig {
    if let Ok(url) = std::env::var("TIDECHAT_SERVER_URL") {
        if !url.is_empty() {
            config.server_url = url;
        }
    }
    if let Ok(enabled) = std::env::var("TIDECHAT_WEB_SEARCH") {
        match enabled.to_ascii_lowercase().as_str() {
            "1" | "true" | "on" | "yes" => config.enable_web_search = true,
            "0" | "false" | "off" | "no" => config.enable_web_search = false,
            other => {
                tracing::warn!(value = other, "ignoring invalid TIDECHAT_WEB_SEARCH");
            }
        }
    }
    config
}
