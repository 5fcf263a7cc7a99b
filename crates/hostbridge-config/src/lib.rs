//! Hostbridge Configuration System
//!
//! Provides configuration management for hosts embedding the boundary:
//! - Project configuration (hostbridge.toml)
//! - User configuration (~/.hostbridge/config.toml)
//! - Environment variable overrides (HOSTBRIDGE_*)
//! - The per-platform runtime directory layout produced by the provisioning tool
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded and merged in the following order (later overrides earlier):
//! 1. User config (~/.hostbridge/config.toml)
//! 2. Project config (./hostbridge.toml, searched upwards)
//! 3. Environment variables (HOSTBRIDGE_*)
//! 4. CLI flags
//!
//! # Example
//!
//! ```no_run
//! use hostbridge_config::ConfigLoader;
//! use std::path::Path;
//!
//! let mut loader = ConfigLoader::new();
//! let config = loader.load_from_directory(Path::new(".")).unwrap();
//! println!("{}", config.runtime_layout().root().display());
//! ```

pub mod loader;
pub mod project;
pub mod runtimes;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Invalid runtime identifier: {0}")]
    InvalidRuntimeIdentifier(String),

    #[error("Unsupported platform: {os}-{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    #[error("Home directory not found")]
    HomeNotFound,
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

// Re-export main types
pub use loader::{Config, ConfigLoader};
pub use project::{BridgeConfig, LoggingConfig, RuntimesConfig, SizePolicy, TransferConfig};
pub use runtimes::{RuntimeIdentifier, RuntimeLayout};
