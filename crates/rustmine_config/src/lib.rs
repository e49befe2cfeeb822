//! Server configuration: the knobs a running server reads at startup.
//!
//! All fields have working defaults so a bare `ServerConfig::default()` yields
//! a server that accepts vanilla 1.21.x clients on localhost.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default TCP bind host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default Minecraft server port.
pub const DEFAULT_PORT: u16 = 25565;

/// Protocol number of the 1.21.x client series.
pub const DEFAULT_PROTOCOL: i32 = 771;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Runtime configuration for the server.
///
/// `version` and `version_protocol` are what the status JSON advertises;
/// `compression_threshold` <= 0 leaves the wire uncompressed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host:                  String,
    pub port:                  u16,
    pub version:               String,
    pub version_protocol:      i32,
    pub max_players:           i32,
    pub description:           String,
    pub favicon:               String,
    pub compression_threshold: i32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host:                  DEFAULT_HOST.to_string(),
            port:                  DEFAULT_PORT,
            version:               "1.21.x".to_string(),
            version_protocol:      DEFAULT_PROTOCOL,
            max_players:           20,
            description:           "A Rust Minecraft Server".to_string(),
            favicon:               String::new(),
            compression_threshold: -1,
        }
    }
}

impl ServerConfig {
    /// Address string suitable for `TcpListener::bind`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether outbound compression should be negotiated at login.
    pub fn compression_enabled(&self) -> bool {
        self.compression_threshold > 0
    }

    /// Load a configuration from a JSON file. Missing fields fall back to
    /// their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr(), "127.0.0.1:25565");
        assert_eq!(config.version_protocol, 771);
        assert!(!config.compression_enabled());
    }

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let json = r#"{ "port": 25570, "compression_threshold": 256 }"#;
        let config: ServerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.port, 25570);
        assert_eq!(config.compression_threshold, 256);
        assert!(config.compression_enabled());
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.max_players, 20);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let err = serde_json::from_str::<ServerConfig>("{ not json").unwrap_err();
        let err = ConfigError::from(err);
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
