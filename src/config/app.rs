//! Main application configuration
//!
//! This module defines the top-level configuration of the ranking service,
//! including environment variable loading, TOML file loading and validation.

use crate::config::{EngineConfig, MapRatingConfig};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub storage: StorageSettings,
    pub engine: EngineConfig,
    pub map: MapRatingConfig,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Credential required by the protected snapshot operations
    pub admin_key: Option<String>,
    /// Deadline around one full ranking computation, in seconds
    pub compute_timeout_seconds: u64,
}

/// Snapshot storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// SQLite database file; `None` keeps snapshots in memory
    pub database_path: Option<PathBuf>,
    /// Minimum number of snapshots a prune must keep
    pub min_retained_snapshots: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "ranking-engine".to_string(),
            log_level: "info".to_string(),
            admin_key: None,
            compute_timeout_seconds: 120,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database_path: None,
            min_retained_snapshots: 3,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file; missing sections use defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AppConfig = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            config.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            config.service.log_level = log_level;
        }
        if let Ok(admin_key) = env::var("ADMIN_KEY") {
            config.service.admin_key = Some(admin_key);
        }
        if let Ok(timeout) = env::var("COMPUTE_TIMEOUT_SECONDS") {
            config.service.compute_timeout_seconds = timeout
                .parse()
                .map_err(|_| anyhow!("Invalid COMPUTE_TIMEOUT_SECONDS value: {}", timeout))?;
        }

        // Storage settings
        if let Ok(path) = env::var("DATABASE_PATH") {
            config.storage.database_path = Some(PathBuf::from(path));
        }

        // Engine settings
        if let Ok(half_life) = env::var("DECAY_HALF_LIFE_DAYS") {
            config.engine.decay.half_life_days = half_life
                .parse()
                .map_err(|_| anyhow!("Invalid DECAY_HALF_LIFE_DAYS value: {}", half_life))?;
        }
        if let Ok(enabled) = env::var("ENABLE_ANOMALY_DETECTION") {
            config.engine.anomaly.enabled = enabled
                .parse()
                .map_err(|_| anyhow!("Invalid ENABLE_ANOMALY_DETECTION value: {}", enabled))?;
        }

        validate_config(&config)?;
        Ok(config)
    }

    /// Get the compute deadline as Duration
    pub fn compute_timeout(&self) -> Duration {
        Duration::from_secs(self.service.compute_timeout_seconds)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.service.compute_timeout_seconds == 0 {
        return Err(anyhow!("Compute timeout must be greater than 0"));
    }

    if let Some(key) = &config.service.admin_key {
        if key.trim().is_empty() {
            return Err(anyhow!("Admin key cannot be blank"));
        }
    }

    if config.storage.min_retained_snapshots == 0 {
        return Err(anyhow!("At least one snapshot must be retained"));
    }

    config.engine.validate()?;
    config.map.validate()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());
        assert_eq!(config.compute_timeout(), Duration::from_secs(120));
        assert!(config.storage.database_path.is_none());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = AppConfig::default();
        config.service.log_level = "loud".to_string();
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.service.admin_key = Some("   ".to_string());
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.engine.elo.base_k = -1.0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_parse_toml() {
        let config: AppConfig = toml::from_str(
            r#"
            [service]
            log_level = "debug"
            admin_key = "secret"

            [storage]
            database_path = "rankings.db"

            [engine.anomaly]
            enabled = true
            "#,
        )
        .unwrap();

        assert!(validate_config(&config).is_ok());
        assert_eq!(config.service.log_level, "debug");
        assert_eq!(config.service.admin_key.as_deref(), Some("secret"));
        assert_eq!(
            config.storage.database_path,
            Some(PathBuf::from("rankings.db"))
        );
        assert!(config.engine.anomaly.enabled);
        assert_eq!(config.service.compute_timeout_seconds, 120);
    }
}
