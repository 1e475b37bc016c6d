//! Configuration management for StarChain

use crate::blockchain::CHALLENGE_WINDOW_SECS;
use crate::crypto::Network;
use crate::error::ChainError;
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Rules the ledger applies to signed challenges.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LedgerConfig {
    /// How long a challenge stays signable, inclusive.
    #[serde(default = "default_challenge_window")]
    pub challenge_window_secs: u64,
    /// Reject challenges dated further than this into the future. Unbounded when unset.
    #[serde(default)]
    pub max_clock_skew_secs: Option<u64>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            challenge_window_secs: default_challenge_window(),
            max_clock_skew_secs: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WalletConfig {
    #[serde(default)]
    pub network: Network,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_challenge_window() -> u64 {
    CHALLENGE_WINDOW_SECS
}

impl Config {
    pub fn from_toml(s: &str) -> Result<Self, ChainError> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ChainError> {
        if self.server.host.trim().is_empty() {
            return Err(ChainError::ConfigError("server.host must not be empty".into()));
        }
        if self.ledger.challenge_window_secs == 0 {
            return Err(ChainError::ConfigError(
                "ledger.challenge_window_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// `PORT` in the environment takes precedence over the file.
    pub fn apply_env_overrides(&mut self) {
        if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
            self.server.port = port;
        }
    }
}

/// Load configuration from `path`; a missing or empty file yields defaults.
pub fn load_config_from(path: impl AsRef<Path>) -> Result<Config, ChainError> {
    let path = path.as_ref();
    let config_str = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };

    if config_str.trim().is_empty() {
        return Ok(Config::default());
    }
    Config::from_toml(&config_str)
}

pub fn load_config() -> Result<Config, ChainError> {
    let mut config = load_config_from(DEFAULT_CONFIG_PATH)?;
    config.apply_env_overrides();
    Ok(config)
}
