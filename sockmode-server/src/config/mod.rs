//! Configuration module for sockmode-server.
//!
//! Handles loading configuration from the TOML file and reading the Slack
//! tokens from the environment (optionally populated from an env file).

pub mod file;

use crate::config::file::{FileConfig, SlackConfig};
use sockmode_sdk::token::{AppToken, BotToken, TokenError};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("failed to load env file: {0}")]
    EnvFileError(#[from] dotenvy::Error),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error(transparent)]
    TokenError(#[from] TokenError),
}

/// Reconnect timing for the connection loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub debug_reconnects: bool,
}

/// Loaded configuration result containing all parts.
#[derive(Debug)]
pub struct LoadedConfig {
    pub channel_buffer: usize,
    pub reconnect: ReconnectPolicy,
    pub slack: SlackConfig,
}

/// Both tokens needed to run.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub app_token: AppToken,
    pub bot_token: BotToken,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: PathBuf,
    env_file: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(config_path: impl AsRef<Path>, env_file: Option<PathBuf>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            env_file,
        }
    }

    /// Load and validate the configuration file.
    ///
    /// A missing file is not an error: every setting has a default.
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let file_config = match std::fs::read_to_string(&self.config_path) {
            Ok(content) => toml::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(
                    "Config file {:?} not found, using defaults",
                    self.config_path
                );
                FileConfig::default()
            }
            Err(e) => return Err(e.into()),
        };

        validate(&file_config)?;
        Ok(build_loaded_config(file_config))
    }

    /// Read both tokens from the environment.
    ///
    /// If an env file was given it is loaded first. Variables that are
    /// already set in the process environment take precedence.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        if let Some(path) = &self.env_file {
            dotenvy::from_path(path)?;
            tracing::info!("Environment loaded from {:?}", path);
        }

        Ok(Credentials {
            app_token: AppToken::from_env()?,
            bot_token: BotToken::from_env()?,
        })
    }
}

fn validate(config: &FileConfig) -> Result<(), ConfigError> {
    if config.dispatch.channel_buffer == 0 {
        return Err(ConfigError::ValidationError(
            "dispatch.channel_buffer must be at least 1".to_string(),
        ));
    }
    if config.socket.reconnect_min_secs == 0 {
        return Err(ConfigError::ValidationError(
            "socket.reconnect_min_secs must be at least 1".to_string(),
        ));
    }
    if config.socket.reconnect_min_secs > config.socket.reconnect_max_secs {
        return Err(ConfigError::ValidationError(format!(
            "socket.reconnect_min_secs ({}) exceeds socket.reconnect_max_secs ({})",
            config.socket.reconnect_min_secs, config.socket.reconnect_max_secs
        )));
    }
    if config.slack.api_base_url.cannot_be_a_base() {
        return Err(ConfigError::ValidationError(format!(
            "slack.api_base_url {} cannot be used as a base url",
            config.slack.api_base_url
        )));
    }
    Ok(())
}

fn build_loaded_config(file_config: FileConfig) -> LoadedConfig {
    LoadedConfig {
        channel_buffer: file_config.dispatch.channel_buffer,
        reconnect: ReconnectPolicy {
            min_delay: Duration::from_secs(file_config.socket.reconnect_min_secs),
            max_delay: Duration::from_secs(file_config.socket.reconnect_max_secs),
            debug_reconnects: file_config.socket.debug_reconnects,
        },
        slack: file_config.slack,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "sockmode-config-{}-{}.toml",
            name,
            std::process::id()
        ));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let loader = ConfigLoader::new("/nonexistent/sockmode.toml", None);
        let loaded = loader.load().unwrap();
        assert_eq!(loaded.channel_buffer, 256);
        assert_eq!(loaded.reconnect.min_delay, Duration::from_secs(1));
        assert_eq!(loaded.reconnect.max_delay, Duration::from_secs(30));
    }

    #[test]
    fn test_load_file() {
        let path = write_config(
            "load",
            "[dispatch]\nchannel_buffer = 8\n[socket]\nreconnect_min_secs = 3\n",
        );
        let loaded = ConfigLoader::new(&path, None).load().unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.channel_buffer, 8);
        assert_eq!(loaded.reconnect.min_delay, Duration::from_secs(3));
    }

    #[test]
    fn test_validation_errors() {
        let cases = [
            "[dispatch]\nchannel_buffer = 0\n",
            "[socket]\nreconnect_min_secs = 0\n",
            "[socket]\nreconnect_min_secs = 10\nreconnect_max_secs = 5\n",
            "[slack]\napi_base_url = \"mailto:ops@example.com\"\n",
        ];
        for (i, content) in cases.into_iter().enumerate() {
            let path = write_config(&format!("invalid-{i}"), content);
            let result = ConfigLoader::new(&path, None).load();
            std::fs::remove_file(&path).ok();
            assert!(
                matches!(result, Err(ConfigError::ValidationError(_))),
                "{content}"
            );
        }
    }

    #[test]
    fn test_parse_error() {
        let path = write_config("parse", "[dispatch]\nchannel_buffer = \"many\"\n");
        let result = ConfigLoader::new(&path, None).load();
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }
}
