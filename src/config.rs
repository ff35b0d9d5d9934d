//! Configuration management for Logkeeper

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use crate::storage::LOGS_DIR_NAME;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Address the HTTP server binds to (default: 127.0.0.1)
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,

    /// Port for the HTTP server (default: 5000)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Root under which the `logs/` tree is written
    #[serde(default = "config_dir")]
    pub data_dir: PathBuf,

    /// Reverse proxies whose `X-Forwarded-For` header is trusted
    #[serde(default)]
    pub trusted_proxies: Vec<IpAddr>,

    /// Filter for the service's own diagnostics, used when RUST_LOG is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Optional file that also receives the service's own diagnostics
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

fn default_bind_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn default_port() -> u16 {
    5000
}

fn default_log_filter() -> String {
    "logkeeper=info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            data_dir: config_dir(),
            trusted_proxies: Vec::new(),
            log_filter: default_log_filter(),
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from the default file, or return default if not found
    pub fn load() -> Result<Self> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from `path`, or return default if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Socket address the server listens on
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }

    /// Directory holding every log partition
    pub fn logs_root(&self) -> PathBuf {
        self.data_dir.join(LOGS_DIR_NAME)
    }
}

/// Get the base configuration directory (~/.logkeeper)
/// Falls back to ./.logkeeper if home directory cannot be determined
pub fn config_dir() -> PathBuf {
    try_config_dir().unwrap_or_else(|| {
        tracing::warn!("Could not determine home directory, using current directory for config");
        PathBuf::from(".logkeeper")
    })
}

/// Try to get the base configuration directory, returning None if home dir is unavailable
pub fn try_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".logkeeper"))
}

/// Get the path to the config file
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Ensure the data directory and its `logs/` tree exist
pub fn ensure_directories(config: &Config) -> Result<()> {
    std::fs::create_dir_all(&config.data_dir).context("Failed to create data directory")?;
    std::fs::create_dir_all(config.logs_root()).context("Failed to create logs directory")?;
    Ok(())
}
