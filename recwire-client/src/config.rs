//! Client configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via RECWIRE_CONFIG or --config)
//! 3. Environment variables

use recwire_protocol::{DEFAULT_PORT, MAX_BODY_SIZE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server host name or address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Namespace used when a request does not name one.
    pub namespace: String,
    /// Connection timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Request timeout in milliseconds. Also sent to the server as the
    /// transaction deadline.
    pub request_timeout_ms: u64,
    /// Largest response body accepted.
    pub max_body_size: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            namespace: "test".to_string(),
            connect_timeout_ms: 1_000,
            request_timeout_ms: 5_000,
            max_body_size: MAX_BODY_SIZE,
        }
    }
}

impl ClientConfig {
    /// Loads configuration from file, then applies environment variable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var("RECWIRE_CONFIG") {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), e.to_string()))
    }

    /// Loads configuration from environment variables only.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Applies environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Applies overrides from an arbitrary variable source. Unparseable
    /// values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("RECWIRE_HOST") {
            self.host = host;
        }

        if let Some(port) = lookup("RECWIRE_PORT") {
            if let Ok(parsed) = port.parse() {
                self.port = parsed;
            }
        }

        if let Some(namespace) = lookup("RECWIRE_NAMESPACE") {
            self.namespace = namespace;
        }

        if let Some(timeout) = lookup("RECWIRE_CONNECT_TIMEOUT_MS") {
            if let Ok(ms) = timeout.parse() {
                self.connect_timeout_ms = ms;
            }
        }

        if let Some(timeout) = lookup("RECWIRE_REQUEST_TIMEOUT_MS") {
            if let Ok(ms) = timeout.parse() {
                self.request_timeout_ms = ms;
            }
        }

        if let Some(size) = lookup("RECWIRE_MAX_BODY_SIZE") {
            if let Ok(n) = size.parse() {
                self.max_body_size = n;
            }
        }
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::Validation("host is empty".to_string()));
        }
        if self.namespace.is_empty() {
            return Err(ConfigError::Validation("namespace is empty".to_string()));
        }
        if self.max_body_size == 0 || self.max_body_size > MAX_BODY_SIZE {
            return Err(ConfigError::Validation(format!(
                "max_body_size must be between 1 and {}",
                MAX_BODY_SIZE
            )));
        }
        Ok(())
    }

    /// Saves configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self)
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::Io(path.to_path_buf(), e))
    }

    /// `host:port`, as accepted by `TcpStream::connect`.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {1}", .0.display())]
    Io(PathBuf, std::io::Error),

    #[error("failed to parse config file '{}': {1}", .0.display())]
    Parse(PathBuf, String),

    #[error("configuration validation failed: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.addr(), "127.0.0.1:3000");
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = ClientConfig {
            namespace: "bar".to_string(),
            ..Default::default()
        };
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: ClientConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.yaml");
        std::fs::write(&path, "host: db.internal\nport: 3100\n").unwrap();

        let config = ClientConfig::from_file(&path).unwrap();
        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port, 3100);
        assert_eq!(config.namespace, "test");
    }

    #[test]
    fn test_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.yaml");
        std::fs::write(&path, "port: 3100\nnamespace: fromfile\n").unwrap();

        let env: HashMap<&str, &str> = [
            ("RECWIRE_NAMESPACE", "fromenv"),
            ("RECWIRE_REQUEST_TIMEOUT_MS", "250"),
            ("RECWIRE_CONNECT_TIMEOUT_MS", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = ClientConfig::from_file(&path).unwrap();
        config.apply_overrides(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.port, 3100);
        assert_eq!(config.namespace, "fromenv");
        assert_eq!(config.request_timeout_ms, 250);
        assert_eq!(config.connect_timeout_ms, 1_000);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.yaml");
        let config = ClientConfig {
            port: 4000,
            ..Default::default()
        };
        config.save(&path).unwrap();
        assert_eq!(ClientConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_errors() {
        let err = ClientConfig::from_file("/nonexistent/recwire.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(..)));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "port: [1, 2]\n").unwrap();
        assert!(matches!(
            ClientConfig::from_file(&path),
            Err(ConfigError::Parse(..))
        ));

        let config = ClientConfig {
            max_body_size: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }
}
