use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::channel;
use crate::error::Result;

/// Runtime settings for the bridge.
///
/// Every field has a default, so a partial (or absent) file is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Name of the duplex pipe shared with the controller
    pub pipe_name: String,
    /// Delay between failed connect attempts, in milliseconds
    pub connect_retry_delay_ms: u64,
    /// Bound on the graceful disconnect at shutdown, in milliseconds
    pub shutdown_timeout_ms: u64,
    /// Optional JSON file overriding the built-in signature set
    pub signatures_file: Option<PathBuf>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            pipe_name: channel::PIPE_NAME.to_string(),
            connect_retry_delay_ms: channel::CONNECT_RETRY_DELAY.as_millis() as u64,
            shutdown_timeout_ms: channel::SHUTDOWN_TIMEOUT.as_millis() as u64,
            signatures_file: None,
        }
    }
}

impl BridgeConfig {
    /// Load config from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Load config from a JSON file, falling back to defaults on any error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {:?}: {}, using defaults",
                    path.as_ref(),
                    e
                );
                Self::default()
            }
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn connect_retry_delay(&self) -> Duration {
        Duration::from_millis(self.connect_retry_delay_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_uses_channel_constants() {
        let config = BridgeConfig::default();
        assert_eq!(config.pipe_name, channel::PIPE_NAME);
        assert_eq!(config.connect_retry_delay(), channel::CONNECT_RETRY_DELAY);
        assert_eq!(config.shutdown_timeout(), channel::SHUTDOWN_TIMEOUT);
        assert!(config.signatures_file.is_none());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.json");
        fs::write(&path, r#"{ "pipe_name": "custom-pipe" }"#).unwrap();

        let config = BridgeConfig::load(&path).unwrap();
        assert_eq!(config.pipe_name, "custom-pipe");
        assert_eq!(config.shutdown_timeout(), channel::SHUTDOWN_TIMEOUT);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.json");
        let config = BridgeConfig {
            shutdown_timeout_ms: 250,
            signatures_file: Some(PathBuf::from("sigs.json")),
            ..Default::default()
        };

        config.save(&path).unwrap();
        assert_eq!(BridgeConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let config = BridgeConfig::load_or_default(dir.path().join("absent.json"));
        assert_eq!(config, BridgeConfig::default());
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.json");
        fs::write(&path, "not json").unwrap();
        assert!(BridgeConfig::load(&path).is_err());
    }
}
