//! Configuration service system for dependency injection and test isolation.
//!
//! This module provides a clean abstraction for configuration management
//! that enables dependency injection and complete test isolation without
//! requiring unsafe code or global state resets.

use crate::{Result, config::Config};
use config::{Config as ConfigCrate, Environment, File};
use log::debug;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Configuration service trait for dependency injection.
///
/// This trait abstracts configuration loading and reloading operations,
/// allowing different implementations for production and testing environments.
pub trait ConfigService: Send + Sync {
    /// Get the current configuration.
    ///
    /// Returns the current [`Config`] instance loaded from files, environment
    /// variables, and defaults. May use internal caching for performance.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or validation fails.
    fn get_config(&self) -> Result<Config>;

    /// Reload configuration from sources, discarding any cached values.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration reloading fails.
    fn reload(&self) -> Result<()>;

    /// Get the default configuration file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be determined.
    fn get_config_file_path(&self) -> Result<PathBuf>;

    /// Get a specific configuration value by dot-separated key path (e.g. `"audio.min_size_bytes"`).
    ///
    /// # Errors
    ///
    /// Returns an error if the key is not recognized.
    fn get_config_value(&self, key: &str) -> Result<String>;
}

/// Production configuration service implementation.
///
/// Loads configuration from multiple sources in order of priority:
/// 1. Environment variables (highest priority)
/// 2. User configuration file (if present)
/// 3. Built-in defaults (lowest priority)
///
/// Configuration is cached after first load.
pub struct ProductionConfigService {
    config_path: Option<PathBuf>,
    cached_config: Arc<RwLock<Option<Config>>>,
}

impl ProductionConfigService {
    /// Create a new production configuration service.
    ///
    /// # Errors
    ///
    /// Returns an error if the default configuration directory cannot be
    /// determined.
    pub fn new() -> Result<Self> {
        let config_path = dirs::config_dir().map(|dir| dir.join("mdtts").join("config.toml"));
        Ok(Self {
            config_path,
            cached_config: Arc::new(RwLock::new(None)),
        })
    }

    /// Create a production configuration service that reads an explicit
    /// config file path instead of the platform default.
    pub fn with_config_path(path: PathBuf) -> Self {
        Self {
            config_path: Some(path),
            cached_config: Arc::new(RwLock::new(None)),
        }
    }

    fn load(&self) -> Result<Config> {
        let mut builder = ConfigCrate::builder()
            .add_source(ConfigCrate::try_from(&Config::default())?);

        if let Some(path) = &self.config_path {
            if path.exists() {
                debug!("loading configuration file: {}", path.display());
                builder = builder.add_source(File::from(path.as_path()).required(false));
            }
        }

        // Environment variables win: MDTTS_SERVER__HOST, MDTTS_AUDIO__MIN_SIZE_BYTES, etc.,
        // plus the original control-plane variable names for interface parity.
        let builder = builder.add_source(
            Environment::with_prefix("MDTTS")
                .separator("__")
                .try_parsing(true),
        );

        let raw = builder.build()?;
        let mut config: Config = raw.try_deserialize()?;

        apply_legacy_env_overrides(&mut config)?;
        config.loaded_from = self.config_path.clone();
        Ok(config)
    }
}

/// Environment variable names inherited verbatim from the HTTP control plane
/// this dispatcher was extracted from; `MDTTS__*` takes precedence, these are
/// the fallback so existing deployments' environments keep working.
fn apply_legacy_env_overrides(config: &mut Config) -> Result<()> {
    use crate::config::validation::{parse_f32, parse_u16, parse_u64, parse_usize};
    use std::env;

    if let Ok(v) = env::var("FLASK_HOST") {
        config.server.host = v;
    }
    if let Ok(v) = env::var("FLASK_PORT") {
        config.server.port = parse_u16(&v)?;
    }
    if let Ok(v) = env::var("FLASK_ENV") {
        config.server.env = v;
    }
    if let Ok(v) = env::var("UPLOAD_FOLDER") {
        config.storage.upload_folder = PathBuf::from(v);
    }
    if let Ok(v) = env::var("GLOBAL_CONCURRENCY_LIMIT") {
        config.dispatch.global_concurrency_limit = parse_usize(&v)?;
    }
    if let Ok(v) = env::var("BALANCER_MAX_CONCURRENCY") {
        config.dispatch.balancer_max_concurrency = parse_usize(&v)?;
    }
    if let Ok(v) = env::var("TTS_MIN_AUDIO_SIZE_BYTES") {
        config.audio.min_size_bytes = parse_u64(&v)?;
    }
    if let Ok(v) = env::var("TTS_MIN_AUDIO_BYTES_PER_CHAR") {
        config.audio.min_bytes_per_char = parse_f32(&v)?;
    }
    Ok(())
}

impl ConfigService for ProductionConfigService {
    fn get_config(&self) -> Result<Config> {
        if let Some(cached) = self.cached_config.read().unwrap().as_ref() {
            return Ok(cached.clone());
        }
        let config = self.load()?;
        *self.cached_config.write().unwrap() = Some(config.clone());
        Ok(config)
    }

    fn reload(&self) -> Result<()> {
        let config = self.load()?;
        *self.cached_config.write().unwrap() = Some(config);
        Ok(())
    }

    fn get_config_file_path(&self) -> Result<PathBuf> {
        self.config_path
            .clone()
            .ok_or_else(|| crate::error::MdttsError::config("no configuration directory available"))
    }

    fn get_config_value(&self, key: &str) -> Result<String> {
        let config = self.get_config()?;
        config_value_by_key(&config, key)
    }
}

fn config_value_by_key(config: &Config, key: &str) -> Result<String> {
    let parts: Vec<&str> = key.split('.').collect();
    match parts.as_slice() {
        ["server", "host"] => Ok(config.server.host.clone()),
        ["server", "port"] => Ok(config.server.port.to_string()),
        ["server", "env"] => Ok(config.server.env.clone()),
        ["storage", "upload_folder"] => Ok(config.storage.upload_folder.display().to_string()),
        ["dispatch", "global_concurrency_limit"] => {
            Ok(config.dispatch.global_concurrency_limit.to_string())
        }
        ["dispatch", "balancer_max_concurrency"] => {
            Ok(config.dispatch.balancer_max_concurrency.to_string())
        }
        ["audio", "min_size_bytes"] => Ok(config.audio.min_size_bytes.to_string()),
        ["audio", "min_bytes_per_char"] => Ok(config.audio.min_bytes_per_char.to_string()),
        _ => Err(crate::error::MdttsError::config(format!(
            "unknown configuration key: {}",
            key
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_value_lookup() {
        let config = Config::default();
        assert_eq!(
            config_value_by_key(&config, "audio.min_size_bytes").unwrap(),
            "4096"
        );
        assert_eq!(
            config_value_by_key(&config, "server.port").unwrap(),
            "5055"
        );
    }

    #[test]
    fn test_config_value_unknown_key() {
        let config = Config::default();
        assert!(config_value_by_key(&config, "nope.nope").is_err());
    }

    #[test]
    fn test_production_service_loads_defaults() {
        let service = ProductionConfigService::with_config_path(PathBuf::from(
            "/nonexistent/mdtts/config.toml",
        ));
        let config = service.get_config().unwrap();
        assert_eq!(config.audio.min_size_bytes, 4096);
    }
}
