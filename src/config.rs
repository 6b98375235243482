//! Runtime configuration
//!
//! Loaded from a JSON file (`--config`, or `<config dir>/shortcutd/config.json`).
//! A missing file yields the defaults; a malformed one is an error.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const NOTIFIER_APP_NAME: &str = "Shortcutd Notifier.app";

/// What to do once a shortcut reports its completion callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandType {
    /// Display a notification with the shortcut outcome on the host.
    Notification,
    /// Run the configured unix command.
    Command,
    /// Run a second shortcut with the outcome as its text input.
    Shortcut,
}

impl CommandType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandType::Notification => "notification",
            CommandType::Command => "command",
            CommandType::Shortcut => "shortcut",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Https,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::Http => write!(f, "http"),
            Protocol::Https => write!(f, "https"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Title used for the default completion notification.
    pub name: String,
    /// Whether to run the x-callback-url server and await shortcut results.
    pub callback_server_enabled: bool,
    pub callback_command_type: CommandType,
    /// Unix command line or shortcut name, depending on the command type.
    pub callback_custom_command: Option<String>,
    /// Time allowed for the completion command, in milliseconds.
    pub callback_command_timeout_ms: u64,
    pub callback_server_hostname: String,
    pub callback_server_port: u16,
    pub callback_server_protocol: Protocol,
    /// Override for the bundled notifier app location.
    pub notifier_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: "Shortcutd".to_string(),
            callback_server_enabled: true,
            callback_command_type: CommandType::Notification,
            callback_custom_command: None,
            callback_command_timeout_ms: 5000,
            callback_server_hostname: "127.0.0.1".to_string(),
            callback_server_port: 63963,
            callback_server_protocol: Protocol::Http,
            notifier_path: None,
        }
    }
}

impl Config {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.callback_command_timeout_ms)
    }

    /// Location of the notifier app invoked by the default completion
    /// command: the configured override, or the app bundled next to the
    /// executable.
    pub fn notifier_app_path(&self) -> PathBuf {
        if let Some(path) = &self.notifier_path {
            return path.clone();
        }
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_default()
            .join(NOTIFIER_APP_NAME)
    }
}

/// Default path of the configuration file.
pub fn config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir().context("Cannot determine config directory")?;
    Ok(config_dir.join("shortcutd").join("config.json"))
}

/// Load the configuration from `path`, or from the default location.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => config_path()?,
    };

    if !path.exists() {
        return Ok(Config::default());
    }

    let data = fs::read_to_string(&path).context("Failed to read config file")?;

    let config: Config = serde_json::from_str(&data).context("Failed to parse config file")?;

    Ok(config)
}
