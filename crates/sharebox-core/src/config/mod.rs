//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section. The storage section additionally honours the flat environment
//! names used by existing deployments (`ENABLE_S3`, `S3_ENDPOINT`, ...).

pub mod app;
pub mod database;
pub mod limits;
pub mod logging;
pub mod migration;
pub mod notification;
pub mod storage;

use serde::{Deserialize, Serialize};

use self::app::ServerConfig;
use self::database::DatabaseConfig;
use self::limits::LimitsConfig;
use self::logging::LoggingConfig;
use self::migration::MigrationConfig;
use self::notification::NotificationConfig;
use self::storage::StorageSettings;

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database connection settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Object storage settings.
    #[serde(default)]
    pub storage: StorageSettings,
    /// Per-user storage limits.
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Legacy filesystem migration and cleanup settings.
    #[serde(default)]
    pub migration: MigrationConfig,
    /// Reverse-share digest notification settings.
    #[serde(default)]
    pub notification: NotificationConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay,
    /// environment variables prefixed with `SHAREBOX__`, and finally the flat
    /// storage variables read by [`StorageSettings::apply_env_overrides`].
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("SHAREBOX")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let mut loaded: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        loaded
            .storage
            .apply_env_overrides(|key| std::env::var(key).ok());
        Ok(loaded)
    }
}
