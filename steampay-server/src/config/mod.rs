//! Configuration module for steampay-server.
//!
//! Handles loading configuration from TOML files, CLI arguments,
//! and environment variables.

pub mod file;

use crate::config::file::FileConfig;
use rust_decimal::Decimal;
use std::net::SocketAddr;
use std::path::Path;
use steampay_core::gateway::GatewaySettings;
use steampay_core::ledger::Limits;
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("DATABASE_URL environment variable not set")]
    MissingDatabaseUrl,
}

/// Loaded configuration result containing all parts.
pub struct LoadedConfig {
    pub listen: SocketAddr,
    pub gateway: GatewaySettings,
    pub limits: Limits,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: std::path::PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file
    /// 2. Apply CLI overrides
    /// 3. Validate the configuration
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        let mut file_config: FileConfig = toml::from_str(&config_content)?;

        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }

        self.validate(&file_config)?;

        Ok(LoadedConfig {
            listen: file_config.server.listen,
            gateway: GatewaySettings {
                api_key: file_config.gateway.api_key,
                callback_url: file_config.gateway.callback_url,
                customer_email: file_config.gateway.customer_email,
            },
            limits: Limits {
                period_ceiling: Decimal::from(file_config.limits.period_ceiling),
                lifetime_ceiling: Decimal::from(file_config.limits.lifetime_ceiling),
            },
        })
    }

    /// Reload the configuration (used during SIGHUP).
    pub fn reload(&self) -> Result<LoadedConfig, ConfigError> {
        self.load()
    }

    fn validate(&self, config: &FileConfig) -> Result<(), ConfigError> {
        if config.gateway.api_key.is_empty() {
            return Err(ConfigError::ValidationError(
                "gateway.api_key must not be empty".to_owned(),
            ));
        }
        if config.limits.period_ceiling == 0 || config.limits.lifetime_ceiling == 0 {
            return Err(ConfigError::ValidationError(
                "limit ceilings must be positive".to_owned(),
            ));
        }
        if config.limits.period_ceiling > config.limits.lifetime_ceiling {
            return Err(ConfigError::ValidationError(
                "limits.period_ceiling must not exceed limits.lifetime_ceiling".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Get the database URL from the environment.
pub fn get_database_url() -> Result<String, ConfigError> {
    std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)
}
