//! Client configuration.
//!
//! Resolution order for the backend base URL: the `VALET_BACKEND_URL`
//! environment variable, then `~/.config/valet/config.toml`, then the local
//! development default.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use valet_core::error::{Result, ValetError};
use valet_core::session::SessionId;

use crate::reconnect::ReconnectPolicy;

/// Environment variable holding the backend base URL.
pub const BACKEND_URL_ENV: &str = "VALET_BACKEND_URL";

/// Base URL used when no configuration is provided.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8001";

/// Resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    base_url: String,
    /// Reconnect delay policy for the realtime channel.
    pub reconnect: ReconnectPolicy,
}

/// On-disk configuration file shape (`~/.config/valet/config.toml`).
#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    backend_url: Option<String>,
    #[serde(default)]
    reconnect: Option<ReconnectPolicy>,
}

impl ClientConfig {
    /// Creates a configuration with the given base URL and the default
    /// reconnect policy. A trailing slash on the URL is normalized away.
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            reconnect: ReconnectPolicy::default(),
        }
    }

    /// Loads configuration from the environment, falling back to the config
    /// file and then to [`DEFAULT_BASE_URL`].
    pub fn from_env() -> Self {
        let file = load_config_file().unwrap_or_default();

        let base_url = std::env::var(BACKEND_URL_ENV)
            .ok()
            .filter(|url| !url.trim().is_empty())
            .or(file.backend_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let mut config = Self::new(base_url);
        if let Some(reconnect) = file.reconnect {
            config.reconnect = reconnect;
        }
        config
    }

    /// The configured backend base URL, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The channel endpoint for the given session, with the scheme
    /// translated for WebSocket use (`http` -> `ws`, `https` -> `wss`).
    pub fn ws_url(&self, session_id: &SessionId) -> String {
        let base = translate_scheme(&self.base_url);
        format!("{}/api/ws/{}", base, session_id)
    }

    /// The approve endpoint for the given command.
    pub fn approve_url(&self, command_id: &str) -> String {
        format!("{}/api/commands/{}/approve", self.base_url, command_id)
    }

    /// The reject endpoint for the given command.
    pub fn reject_url(&self, command_id: &str) -> String {
        format!("{}/api/commands/{}/reject", self.base_url, command_id)
    }

    /// The system information endpoint.
    pub fn system_info_url(&self) -> String {
        format!("{}/api/system-info", self.base_url)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

/// Substitutes the URL scheme for WebSocket use.
fn translate_scheme(base_url: &str) -> String {
    if let Some(rest) = base_url.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base_url.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        base_url.to_string()
    }
}

/// Loads the optional configuration file from ~/.config/valet/config.toml
fn load_config_file() -> Result<ConfigFile> {
    let path = config_file_path()?;
    read_config_file(&path)
}

/// Reads and parses the configuration file at `path`. A missing file is not
/// an error; it yields the defaults.
fn read_config_file(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        return Ok(ConfigFile::default());
    }

    let content = fs::read_to_string(path).map_err(|e| {
        ValetError::config(format!(
            "Failed to read configuration file at {}: {}",
            path.display(),
            e
        ))
    })?;

    debug!(path = %path.display(), "loaded configuration file");
    toml::from_str(&content).map_err(ValetError::from)
}

/// Returns the path to the configuration file: ~/.config/valet/config.toml
fn config_file_path() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ValetError::config("Could not determine home directory"))?;
    Ok(home.join(".config").join("valet").join("config.toml"))
}
