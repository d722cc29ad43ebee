//! Test configuration service for isolated testing.
//!
//! This module provides a configuration service implementation specifically
//! designed for testing environments, offering complete isolation and
//! predictable configuration states.

use crate::config::service::ConfigService;
use crate::{Result, config::Config};
use std::path::PathBuf;

/// Test configuration service implementation.
///
/// This service provides a fixed configuration for testing purposes,
/// ensuring complete isolation between tests and predictable behavior.
/// It does not load from external sources or cache.
pub struct TestConfigService {
    fixed_config: Config,
}

impl TestConfigService {
    /// Create a new test configuration service with the provided configuration.
    pub fn new(config: Config) -> Self {
        Self {
            fixed_config: config,
        }
    }

    /// Create a test configuration service with default settings.
    pub fn with_defaults() -> Self {
        Self::new(Config::default())
    }

    /// Create a test configuration service with specific dispatch settings.
    ///
    /// # Arguments
    ///
    /// * `global_concurrency_limit` - process-wide cap, 0 disables it
    /// * `balancer_max_concurrency` - overrides `G`, 0 means "use worker count"
    pub fn with_dispatch_settings(
        global_concurrency_limit: usize,
        balancer_max_concurrency: usize,
    ) -> Self {
        let mut config = Config::default();
        config.dispatch.global_concurrency_limit = global_concurrency_limit;
        config.dispatch.balancer_max_concurrency = balancer_max_concurrency;
        Self::new(config)
    }

    /// Create a test configuration service with specific audio thresholds.
    pub fn with_audio_settings(min_size_bytes: u64, min_bytes_per_char: f32) -> Self {
        let mut config = Config::default();
        config.audio.min_size_bytes = min_size_bytes;
        config.audio.min_bytes_per_char = min_bytes_per_char;
        Self::new(config)
    }

    /// Create a test configuration service rooted at a given upload folder.
    ///
    /// Useful together with `tempfile::TempDir` for filesystem-isolated tests.
    pub fn with_upload_folder(path: impl Into<PathBuf>) -> Self {
        let mut config = Config::default();
        config.storage.upload_folder = path.into();
        Self::new(config)
    }

    /// Get the underlying configuration.
    pub fn config(&self) -> &Config {
        &self.fixed_config
    }

    /// Get a mutable reference to the underlying configuration.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.fixed_config
    }
}

impl ConfigService for TestConfigService {
    fn get_config(&self) -> Result<Config> {
        Ok(self.fixed_config.clone())
    }

    fn reload(&self) -> Result<()> {
        // Test configuration doesn't need reloading since it's fixed.
        Ok(())
    }

    fn get_config_file_path(&self) -> Result<PathBuf> {
        Ok(PathBuf::from("/tmp/mdtts_test_config.toml"))
    }

    fn get_config_value(&self, key: &str) -> Result<String> {
        let config = &self.fixed_config;
        let parts: Vec<&str> = key.split('.').collect();
        match parts.as_slice() {
            ["server", "host"] => Ok(config.server.host.clone()),
            ["server", "port"] => Ok(config.server.port.to_string()),
            ["storage", "upload_folder"] => Ok(config.storage.upload_folder.display().to_string()),
            ["dispatch", "global_concurrency_limit"] => {
                Ok(config.dispatch.global_concurrency_limit.to_string())
            }
            ["audio", "min_size_bytes"] => Ok(config.audio.min_size_bytes.to_string()),
            ["audio", "min_bytes_per_char"] => Ok(config.audio.min_bytes_per_char.to_string()),
            _ => Err(crate::error::MdttsError::config(format!(
                "Unknown configuration key: {}",
                key
            ))),
        }
    }
}

impl Default for TestConfigService {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_service_with_defaults() {
        let service = TestConfigService::with_defaults();
        let config = service.get_config().unwrap();
        assert_eq!(config.server.port, 5055);
        assert_eq!(config.audio.min_size_bytes, 4096);
    }

    #[test]
    fn test_config_service_with_dispatch_settings() {
        let service = TestConfigService::with_dispatch_settings(8, 4);
        let config = service.get_config().unwrap();
        assert_eq!(config.dispatch.global_concurrency_limit, 8);
        assert_eq!(config.dispatch.balancer_max_concurrency, 4);
    }

    #[test]
    fn test_config_service_with_audio_settings() {
        let service = TestConfigService::with_audio_settings(8192, 2.5);
        let config = service.get_config().unwrap();
        assert_eq!(config.audio.min_size_bytes, 8192);
        assert_eq!(config.audio.min_bytes_per_char, 2.5);
    }

    #[test]
    fn test_config_service_reload() {
        let service = TestConfigService::with_defaults();
        assert!(service.reload().is_ok());
    }

    #[test]
    fn test_config_service_direct_access() {
        let mut service = TestConfigService::with_defaults();
        assert_eq!(service.config().server.host, "0.0.0.0");

        service.config_mut().server.host = "127.0.0.1".to_string();
        assert_eq!(service.config().server.host, "127.0.0.1");

        let config = service.get_config().unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
    }
}
