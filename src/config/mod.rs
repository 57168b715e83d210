//! Configuration management

use crate::mux::{SessionConfig, MAX_PAYLOAD_SIZE};
use crate::transport::TransportConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Identity advertised during the handshake
    pub identity: IdentityConfig,
    /// Transport configuration
    pub transport: TransportSettings,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, crate::Error> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("Failed to read config: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), crate::Error> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::Error::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| crate::Error::Config(format!("Failed to write config: {}", e)))
    }

    /// Build the handshake parameters from this configuration
    ///
    /// The signer is not part of the file; attach one to the returned
    /// value before connecting to devices that require authentication.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            identity: self.identity.system_type.clone(),
            features: self.identity.features.clone(),
            max_payload: self.identity.max_payload,
            signer: None,
        }
    }

    /// Build the connection parameters from this configuration
    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            connect_timeout: self.transport.connect_timeout,
            keepalive: self.transport.keepalive,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            identity: IdentityConfig::default(),
            transport: TransportSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Handshake identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// System type sent in the banner, normally "host"
    pub system_type: String,
    /// Features advertised to devices
    pub features: Vec<String>,
    /// Maximum packet payload offered at handshake
    pub max_payload: u32,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        let defaults = SessionConfig::default();
        Self {
            system_type: defaults.identity,
            features: defaults.features,
            max_payload: MAX_PAYLOAD_SIZE,
        }
    }
}

/// Transport settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportSettings {
    /// Default device address for TCP connections
    pub address: String,
    /// Connect timeout in seconds
    pub connect_timeout: u64,
    /// Enable TCP keepalive
    pub keepalive: bool,
}

impl Default for TransportSettings {
    fn default() -> Self {
        let defaults = TransportConfig::default();
        Self {
            address: "127.0.0.1:5555".to_string(),
            connect_timeout: defaults.connect_timeout,
            keepalive: defaults.keepalive,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (pretty, json, compact)
    pub format: String,
    /// Log file path (optional)
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_roundtrip() {
        let config = Config::default();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("adb-mux.toml");

        config.save(&path).unwrap();
        let loaded = Config::load(&path).unwrap();

        assert_eq!(loaded.identity.system_type, "host");
        assert_eq!(loaded.transport.address, "127.0.0.1:5555");
        assert_eq!(loaded.logging.level, "info");
    }

    #[test]
    fn test_parse_partial_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "identity = 5").unwrap();

        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_session_config_mapping() {
        let mut config = Config::default();
        config.identity.features = vec!["shell_v2".to_string()];
        config.identity.max_payload = 256 * 1024;

        let session = config.session_config();
        assert_eq!(session.features, vec!["shell_v2".to_string()]);
        assert_eq!(session.max_payload, 256 * 1024);
        assert!(session.signer.is_none());
    }
}
