//! Viewer configuration
//!
//! Defaults target the dfuse mainnet endpoint. An optional TOML file can
//! override the network and feed filter; the `DFUSE_API_TOKEN` environment
//! variable supplies (or overrides) the API token.

use std::path::PathBuf;

use serde::Deserialize;
use tracing::warn;

/// Environment variable holding the dfuse API token
pub const TOKEN_ENV_VAR: &str = "DFUSE_API_TOKEN";

/// Instructional messages shown when no API token is configured.
///
/// Blank entries render as blank separator lines.
pub const MISSING_TOKEN_HELP: [&str; 9] = [
    "To stream transfers, you need to define an environment variable",
    "named 'DFUSE_API_TOKEN' with the value being your dfuse API token.",
    "",
    "To make it into effect, define the variable before launching the",
    "viewer, something like:",
    "",
    "DFUSE_API_TOKEN=ey....af chaintap",
    "",
    "You can obtain a free API token by visiting https://dfuse.io",
];

/// Runtime configuration for the viewer
#[derive(Debug, Clone)]
pub struct Config {
    /// dfuse API token; `None` disables connection attempts
    pub api_token: Option<String>,
    /// Streaming API host
    pub network: String,
    /// Token contract account to watch
    pub account: String,
    /// Action name to watch
    pub action: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_token: None,
            network: "mainnet.eos.dfuse.io".to_string(),
            account: "eosio.token".to_string(),
            action: "transfer".to_string(),
        }
    }
}

/// Subset of [`Config`] accepted from the config file
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    api_token: Option<String>,
    network: Option<String>,
    account: Option<String>,
    action: Option<String>,
}

impl Config {
    /// Load configuration: file overrides defaults, environment overrides file
    pub fn load() -> Self {
        let mut config = Self::default();

        if let Some(path) = Self::config_path() {
            if let Ok(content) = std::fs::read_to_string(&path) {
                match toml::from_str::<FileConfig>(&content) {
                    Ok(file) => config.apply_file(file),
                    Err(e) => warn!("Failed to parse {}: {}", path.display(), e),
                }
            }
        }

        if let Ok(token) = std::env::var(TOKEN_ENV_VAR) {
            if !token.is_empty() {
                config.api_token = Some(token);
            }
        }

        config
    }

    /// Path to the optional TOML config file
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("chaintap").join("config.toml"))
    }

    /// Streaming endpoint URL including the token query parameter.
    ///
    /// `None` when no token is configured.
    pub fn endpoint_url(&self) -> Option<String> {
        self.api_token
            .as_ref()
            .map(|token| format!("wss://{}/v1/stream?token={}", self.network, token))
    }

    fn apply_file(&mut self, file: FileConfig) {
        if file.api_token.is_some() {
            self.api_token = file.api_token;
        }
        if let Some(network) = file.network {
            self.network = network;
        }
        if let Some(account) = file.account {
            self.account = account;
        }
        if let Some(action) = file.action {
            self.action = action;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_requires_token() {
        let config = Config::default();
        assert_eq!(config.endpoint_url(), None);
    }

    #[test]
    fn test_endpoint_url_shape() {
        let config = Config {
            api_token: Some("abc".to_string()),
            ..Config::default()
        };
        assert_eq!(
            config.endpoint_url().unwrap(),
            "wss://mainnet.eos.dfuse.io/v1/stream?token=abc"
        );
    }

    #[test]
    fn test_file_overrides_defaults() {
        let file: FileConfig =
            toml::from_str("network = \"kylin.eos.dfuse.io\"\naccount = \"mytoken\"").unwrap();

        let mut config = Config::default();
        config.apply_file(file);

        assert_eq!(config.network, "kylin.eos.dfuse.io");
        assert_eq!(config.account, "mytoken");
        // Untouched keys keep their defaults
        assert_eq!(config.action, "transfer");
        assert_eq!(config.api_token, None);
    }
}
