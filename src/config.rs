// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for dcs
//!
//! [`ClientConfig`] is the immutable value handed to the session driver and
//! the page fetcher. [`Config`] holds user defaults loaded from
//! `.dcsrc.toml` in the current directory or `~/.config/dcs/config.toml`.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Public Debian Code Search instance
pub const DEFAULT_HOST: &str = "codesearch.debian.net";

/// Minimum time between two page fetches, in milliseconds
pub const DEFAULT_DELAY_MS: u64 = 200;

/// Context lines shown around each match when nothing else is configured
pub const DEFAULT_CONTEXT: i64 = 2;

/// Identifies this client on every request
pub fn default_user_agent() -> String {
    format!(
        "dcs-cli/{} (+https://codesearch.debian.net/)",
        env!("CARGO_PKG_VERSION")
    )
}

/// Connection settings shared by every request of one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub host: String,
    pub user_agent: String,
    /// Minimum interval between successive page fetches
    pub delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            user_agent: default_user_agent(),
            delay: Duration::from_millis(DEFAULT_DELAY_MS),
        }
    }
}

impl ClientConfig {
    /// Endpoint of the live query session
    pub fn socket_url(&self) -> String {
        format!("wss://{}/instantws", self.host)
    }

    /// URL of one result resource (`packages`, `page_0`, ...) of a query
    pub fn results_url(&self, query_id: &str, resource: &str) -> String {
        format!("https://{}/results/{}/{}.json", self.host, query_id, resource)
    }

    /// Web search page for a query, used by the browser shortcut
    pub fn search_url(&self, query: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
        format!("https://{}/search?q={}", self.host, encoded)
    }
}

/// User defaults loaded from .dcsrc.toml or ~/.config/dcs/config.toml
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Code search host
    pub host: Option<String>,
    /// Minimum time between page fetches in milliseconds
    pub delay_ms: Option<u64>,
    /// Default number of context lines (clamped to 0..=2)
    pub context: Option<i64>,
    /// Default color mode: never, always or auto
    pub color: Option<String>,
    /// Pager command used when $PAGER is unset
    pub pager: Option<String>,
}

impl Config {
    /// Load configuration from files
    ///
    /// Precedence (highest to lowest):
    /// 1. .dcsrc.toml in current directory
    /// 2. ~/.config/dcs/config.toml
    pub fn load() -> Self {
        if let Some(config) = Self::load_from_path(Path::new(".dcsrc.toml")) {
            return config;
        }

        if let Some(config_path) = Self::user_config_path() {
            if let Some(config) = Self::load_from_path(&config_path) {
                return config;
            }
        }

        Self::default()
    }

    pub fn load_from_path(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        match toml::from_str(&content) {
            Ok(config) => Some(config),
            Err(e) => {
                eprintln!("Warning: Failed to parse {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Merge CLI options with config (CLI wins)
    pub fn client_config(&self, cli_host: Option<&str>, cli_delay_ms: Option<u64>) -> ClientConfig {
        let defaults = ClientConfig::default();
        ClientConfig {
            host: cli_host
                .map(str::to_string)
                .or_else(|| self.host.clone())
                .unwrap_or(defaults.host),
            delay: cli_delay_ms
                .or(self.delay_ms)
                .map(Duration::from_millis)
                .unwrap_or(defaults.delay),
            user_agent: defaults.user_agent,
        }
    }

    pub fn merge_context(&self, cli_value: Option<i64>) -> i64 {
        cli_value.or(self.context).unwrap_or(DEFAULT_CONTEXT)
    }

    /// Config file location in the user's home directory
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config").join("dcs").join("config.toml"))
    }
}
