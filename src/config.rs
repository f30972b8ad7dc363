//! Configuration management module.

use crate::jvc::{ClientOptions, DEFAULT_PORT, RetryPolicy};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration load result.
#[derive(Debug)]
pub enum ConfigLoadResult {
    /// Config loaded successfully.
    Loaded(AppConfig),
    /// Config file missing (first run).
    Missing,
    /// Config file exists but invalid.
    Invalid(ConfigError),
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Validation failed: {0}")]
    Validation(String),
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub projector: ProjectorConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
}

/// Projector connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectorConfig {
    pub host: String,
    /// TCP control port (default: 20554).
    #[serde(default = "default_port")]
    pub port: u16,
    /// Read timeout for ordinary commands in milliseconds (default: 2000).
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Read timeout for power and lens memory operations (default: 60000).
    #[serde(default = "default_slow_timeout_ms")]
    pub slow_timeout_ms: u64,
    /// Handshake attempts before giving up (default: 10).
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,
    /// Backoff step between attempts in milliseconds (default: 1100).
    #[serde(default = "default_backoff_step_ms")]
    pub backoff_step_ms: u64,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_timeout_ms() -> u64 {
    2000
}

fn default_slow_timeout_ms() -> u64 {
    60_000
}

fn default_connect_attempts() -> u32 {
    10
}

fn default_backoff_step_ms() -> u64 {
    1100
}

/// Polling cadence for `watch`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Poll interval while the lamp is on or transitioning.
    pub active_interval_secs: u64,
    /// Poll interval while the projector is off.
    pub idle_interval_secs: u64,
}

impl AppConfig {
    /// Get config file path in the platform config directory.
    pub fn default_path() -> PathBuf {
        ProjectDirs::from("", "", "dila-remote")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
            .join("config.toml")
    }

    /// Attempt to load config with detailed result.
    pub fn try_load(path: &Path) -> ConfigLoadResult {
        if !path.exists() {
            return ConfigLoadResult::Missing;
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str::<AppConfig>(&content) {
                Ok(config) => match config.validate() {
                    Ok(()) => ConfigLoadResult::Loaded(config),
                    Err(e) => ConfigLoadResult::Invalid(e),
                },
                Err(e) => ConfigLoadResult::Invalid(ConfigError::Parse(e)),
            },
            Err(e) => ConfigLoadResult::Invalid(ConfigError::Read(e)),
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let projector = &self.projector;
        if projector.host.trim().is_empty() {
            return Err(ConfigError::Validation("Projector host cannot be empty".to_string()));
        }
        if projector.port == 0 {
            return Err(ConfigError::Validation("Port must be greater than 0".to_string()));
        }
        if projector.timeout_ms < 100 {
            return Err(ConfigError::Validation("Timeout must be at least 100 ms".to_string()));
        }
        if projector.slow_timeout_ms < projector.timeout_ms {
            return Err(ConfigError::Validation(
                "Slow timeout cannot be shorter than the normal timeout".to_string(),
            ));
        }
        if projector.connect_attempts == 0 {
            return Err(ConfigError::Validation("Connect attempts must be at least 1".to_string()));
        }
        if self.monitor.active_interval_secs == 0 || self.monitor.idle_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "Poll intervals must be at least 1 second".to_string(),
            ));
        }
        Ok(())
    }

    /// Save configuration to file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl ProjectorConfig {
    /// Client options for ordinary commands.
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            port: self.port,
            timeout: Duration::from_millis(self.timeout_ms),
            retry: RetryPolicy {
                attempts: self.connect_attempts,
                step: Duration::from_millis(self.backoff_step_ms),
            },
        }
    }

    pub fn slow_timeout(&self) -> Duration {
        Duration::from_millis(self.slow_timeout_ms)
    }
}

impl MonitorConfig {
    pub fn active_interval(&self) -> Duration {
        Duration::from_secs(self.active_interval_secs)
    }

    pub fn idle_interval(&self) -> Duration {
        Duration::from_secs(self.idle_interval_secs)
    }
}

impl Default for ProjectorConfig {
    fn default() -> Self {
        Self {
            host: "192.168.1.50".to_string(),
            port: default_port(),
            timeout_ms: default_timeout_ms(),
            slow_timeout_ms: default_slow_timeout_ms(),
            connect_attempts: default_connect_attempts(),
            backoff_step_ms: default_backoff_step_ms(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            active_interval_secs: 5,
            idle_interval_secs: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_client_options() {
        let options = ProjectorConfig::default().client_options();
        assert_eq!(options.port, 20554);
        assert_eq!(options.timeout, Duration::from_secs(2));
        assert_eq!(options.retry, RetryPolicy::default());
    }

    #[test]
    fn test_minimal_file_uses_defaults() {
        let config: AppConfig = toml::from_str("[projector]\nhost = \"10.0.0.7\"\n").unwrap();
        assert_eq!(config.projector.host, "10.0.0.7");
        assert_eq!(config.projector.port, 20554);
        assert_eq!(config.projector.slow_timeout_ms, 60_000);
        assert_eq!(config.monitor.idle_interval_secs, 60);
    }

    #[test]
    fn test_validation_empty_host() {
        let mut config = AppConfig::default();
        config.projector.host = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_invalid_port() {
        let mut config = AppConfig::default();
        config.projector.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_timeouts() {
        let mut config = AppConfig::default();

        config.projector.timeout_ms = 50;
        assert!(config.validate().is_err());

        config.projector.timeout_ms = 5000;
        config.projector.slow_timeout_ms = 1000;
        assert!(config.validate().is_err());

        config.projector.slow_timeout_ms = 5000;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_zero_attempts() {
        let mut config = AppConfig::default();
        config.projector.connect_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = AppConfig::default();
        config.projector.host = "projector.local".to_string();
        config.save(&path).unwrap();

        match AppConfig::try_load(&path) {
            ConfigLoadResult::Loaded(loaded) => assert_eq!(loaded.projector.host, "projector.local"),
            other => panic!("unexpected load result {other:?}"),
        }
    }

    #[test]
    fn test_missing_and_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        assert!(matches!(AppConfig::try_load(&path), ConfigLoadResult::Missing));

        std::fs::write(&path, "projector = 5").unwrap();
        assert!(matches!(AppConfig::try_load(&path), ConfigLoadResult::Invalid(_)));
    }
}
