//! Configuration management.
//!
//! Supports configuration from:
//! - TOML config files
//! - Environment variables (`WDBRIDGE_*`)
//! - CLI arguments

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::capabilities::DEFAULT_SPILL_THRESHOLD;
use crate::error::{BridgeError, Result};

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP front end configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Upstream endpoint configuration
    #[serde(default)]
    pub upstream: UpstreamConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| BridgeError::Config(format!("Failed to read config file: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| BridgeError::Config(format!("Failed to parse config: {e}")))
    }

    /// The default config file location, if the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("wdbridge").join("config.toml"))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("WDBRIDGE_HOST") {
            config.server.host = host;
        }
        if let Ok(port) = std::env::var("WDBRIDGE_PORT") {
            if let Ok(port) = port.parse() {
                config.server.port = port;
            }
        }
        if let Ok(secs) = std::env::var("WDBRIDGE_IDLE_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse() {
                config.server.idle_timeout_secs = secs;
            }
        }
        if let Ok(secs) = std::env::var("WDBRIDGE_COMMAND_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse() {
                config.server.command_timeout_secs = secs;
            }
        }
        if let Ok(url) = std::env::var("WDBRIDGE_UPSTREAM_URL") {
            config.upstream.url = url;
        }

        config
    }

    /// Merge with another config (other takes precedence)
    pub fn merge(self, other: Self) -> Self {
        fn pick<T: PartialEq>(base: T, other: T, default: T) -> T {
            if other != default {
                other
            } else {
                base
            }
        }

        let server_defaults = ServerConfig::default();
        let upstream_defaults = UpstreamConfig::default();

        Self {
            server: ServerConfig {
                host: pick(self.server.host, other.server.host, server_defaults.host),
                port: pick(self.server.port, other.server.port, server_defaults.port),
                idle_timeout_secs: pick(
                    self.server.idle_timeout_secs,
                    other.server.idle_timeout_secs,
                    server_defaults.idle_timeout_secs,
                ),
                command_timeout_secs: pick(
                    self.server.command_timeout_secs,
                    other.server.command_timeout_secs,
                    server_defaults.command_timeout_secs,
                ),
                spill_threshold_bytes: pick(
                    self.server.spill_threshold_bytes,
                    other.server.spill_threshold_bytes,
                    server_defaults.spill_threshold_bytes,
                ),
            },
            upstream: UpstreamConfig {
                url: pick(self.upstream.url, other.upstream.url, upstream_defaults.url),
                request_timeout_secs: pick(
                    self.upstream.request_timeout_secs,
                    other.upstream.request_timeout_secs,
                    upstream_defaults.request_timeout_secs,
                ),
            },
        }
    }
}

/// HTTP front end configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Idle window after which unused sessions are evicted, in seconds
    pub idle_timeout_secs: u64,

    /// Per-command upstream wait bound, in seconds
    pub command_timeout_secs: u64,

    /// Request bodies above this size spill to disk
    pub spill_threshold_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4444,
            idle_timeout_secs: 300,
            command_timeout_secs: 120,
            spill_threshold_bytes: DEFAULT_SPILL_THRESHOLD,
        }
    }
}

impl ServerConfig {
    /// Get the full listen address
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

/// Upstream endpoint configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the upstream WebDriver endpoint
    pub url: String,

    /// HTTP client timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:9515".to_string(),
            request_timeout_secs: 120,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 4444);
        assert_eq!(config.upstream.url, "http://127.0.0.1:9515");
        assert_eq!(config.server.idle_timeout(), Duration::from_secs(300));
    }

    #[test]
    fn test_listen_addr() {
        let config = ServerConfig::default();
        assert_eq!(config.listen_addr(), "127.0.0.1:4444");
    }

    #[test]
    fn test_config_from_toml() {
        let toml = r#"
            [server]
            host = "0.0.0.0"
            port = 4445
            idle_timeout_secs = 60
            command_timeout_secs = 30
            spill_threshold_bytes = 1048576

            [upstream]
            url = "http://driver:4444"
            request_timeout_secs = 90
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 4445);
        assert_eq!(config.upstream.url, "http://driver:4444");
        assert_eq!(config.server.command_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_merge_prefers_non_default_other() {
        let base = Config {
            server: ServerConfig {
                port: 5555,
                ..Default::default()
            },
            ..Default::default()
        };
        let other = Config {
            upstream: UpstreamConfig {
                url: "http://grid:4444".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };

        let merged = base.merge(other);
        assert_eq!(merged.server.port, 5555);
        assert_eq!(merged.upstream.url, "http://grid:4444");
    }
}
