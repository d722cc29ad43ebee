//! Configuration management module for mdtts.
//!
//! This module provides the configuration service system with dependency
//! injection support, matching the layered validation architecture used
//! throughout this crate.
//!
//! # Key Components
//!
//! - [`Config`] - Main configuration structure containing all settings
//! - [`ConfigService`] - Service interface for configuration management
//! - [`ProductionConfigService`] - Production implementation with file + env I/O
//! - [`TestConfigService`] - Test implementation with fixed, in-memory behavior
//!
//! # Examples
//!
//! ```rust
//! use mdtts_cli::config::{Config, ConfigService, ProductionConfigService};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config_service = ProductionConfigService::new()?;
//! let config = config_service.get_config()?;
//! println!("upload folder: {:?}", config.storage.upload_folder);
//! # Ok(())
//! # }
//! ```
//!
//! All configuration access should go through the [`ConfigService`] trait
//! rather than reading environment variables directly, so commands can be
//! tested against a [`TestConfigService`] instead.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod service;
pub mod test_service;
pub mod validation;

/// Full application configuration for mdtts.
///
/// Aggregates the ambient knobs the dispatcher and its CLI front-end read
/// from the environment (§6/§11 of the governing specification).
///
/// # Examples
///
/// ```rust
/// use mdtts_cli::config::Config;
///
/// let config = Config::default();
/// assert_eq!(config.server.port, 5055);
/// assert_eq!(config.audio.min_size_bytes, 4096);
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Interface parity fields from the original HTTP control plane.
    pub server: ServerConfig,
    /// Upload root and batch-directory naming.
    pub storage: StorageConfig,
    /// Dispatcher concurrency knobs.
    pub dispatch: DispatchConfig,
    /// Audio validity thresholds.
    pub audio: AudioConfig,
    /// Optional file path from which the configuration was loaded.
    pub loaded_from: Option<PathBuf>,
}

/// `FLASK_HOST`/`FLASK_PORT`/`FLASK_ENV` parity fields.
///
/// This crate has no listening server; these are accepted and validated for
/// interface parity with the control plane this dispatcher was extracted
/// from, but otherwise unused.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    /// Bind host, unused by the CLI.
    pub host: String,
    /// Bind port, unused by the CLI.
    pub port: u16,
    /// Deployment environment label (e.g. "production", "development").
    pub env: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5055,
            env: "production".to_string(),
        }
    }
}

/// Upload root configuration.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StorageConfig {
    /// Root directory under which batch directories are created.
    pub upload_folder: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_folder: PathBuf::from("uploads"),
        }
    }
}

/// Dispatcher concurrency configuration.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DispatchConfig {
    /// Process-wide concurrency cap shared by every batch; 0 disables it.
    pub global_concurrency_limit: usize,
    /// Overrides the per-batch global permit count `G`; 0 means "use worker count".
    pub balancer_max_concurrency: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            global_concurrency_limit: 0,
            balancer_max_concurrency: 0,
        }
    }
}

/// Audio acceptance thresholds used by the task executor's size check.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AudioConfig {
    /// Minimum accepted audio size in bytes, regardless of input length.
    pub min_size_bytes: u64,
    /// Minimum accepted bytes per input character.
    pub min_bytes_per_char: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            min_size_bytes: 4096,
            min_bytes_per_char: 3.0,
        }
    }
}

// Re-export the configuration service system
pub use service::{ConfigService, ProductionConfigService};
pub use test_service::TestConfigService;
