//! Configuration Loader
//!
//! Handles loading and merging configuration from multiple sources with proper precedence.

use crate::project::BridgeConfig;
use crate::runtimes::{RuntimeIdentifier, RuntimeLayout, DEFAULT_RUNTIMES_DIR};
use crate::{ConfigError, ConfigResult, SizePolicy};
use std::env;
use std::path::{Path, PathBuf};

/// Name of the project configuration file
pub const CONFIG_FILE_NAME: &str = "hostbridge.toml";

/// Configuration loader
///
/// Loads configuration from multiple sources and merges them with proper precedence:
/// 1. User config (~/.hostbridge/config.toml) - lowest priority
/// 2. Project config (./hostbridge.toml) - overrides user
/// 3. Environment variables (HOSTBRIDGE_*) - overrides project
/// 4. CLI flags - highest priority (handled by caller)
pub struct ConfigLoader {
    /// Cached user config path
    user_config_path: Option<PathBuf>,
    /// Skip the user-level file entirely
    skip_user_config: bool,
}

/// Merged configuration result
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Effective configuration after merging every layer
    pub bridge: BridgeConfig,

    /// Project root directory (where hostbridge.toml was found)
    pub project_root: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            user_config_path: None,
            skip_user_config: false,
        }
    }

    /// Create a loader that ignores ~/.hostbridge/config.toml
    pub fn without_user_config() -> Self {
        Self {
            user_config_path: None,
            skip_user_config: true,
        }
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find hostbridge.toml, then layers it on
    /// top of the user config and applies environment overrides.
    pub fn load_from_directory(&mut self, start_dir: &Path) -> ConfigResult<Config> {
        let (project_root, project_config) = self.find_project_config(start_dir)?;
        let user_config = self.load_user_config()?;

        let bridge = self.apply_env_overrides(user_config.merge(project_config))?;
        bridge.validate()?;

        Ok(Config {
            bridge,
            project_root,
        })
    }

    /// Load configuration from a specific project config file
    pub fn load_from_file(&mut self, config_path: &Path) -> ConfigResult<Config> {
        let project_config = BridgeConfig::load_from_file(config_path)?;
        let user_config = self.load_user_config()?;

        let bridge = self.apply_env_overrides(user_config.merge(project_config))?;
        bridge.validate()?;

        Ok(Config {
            bridge,
            project_root: config_path.parent().map(|p| p.to_path_buf()),
        })
    }

    /// Find project configuration by walking up directory tree
    ///
    /// Returns (project_root, project_config); a default config with no root
    /// when nothing is found.
    fn find_project_config(
        &self,
        start_dir: &Path,
    ) -> ConfigResult<(Option<PathBuf>, BridgeConfig)> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(CONFIG_FILE_NAME);

            if config_path.exists() {
                let project_config = BridgeConfig::load_from_file(&config_path)?;
                return Ok((Some(current), project_config));
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return Ok((None, BridgeConfig::default())),
            }
        }
    }

    /// Load user configuration from ~/.hostbridge/config.toml
    fn load_user_config(&mut self) -> ConfigResult<BridgeConfig> {
        if self.skip_user_config {
            return Ok(BridgeConfig::default());
        }

        if self.user_config_path.is_none() {
            match Self::user_config_dir() {
                Ok(dir) => self.user_config_path = Some(dir.join("config.toml")),
                // No home directory means there is no user layer
                Err(ConfigError::HomeNotFound) => return Ok(BridgeConfig::default()),
                Err(e) => return Err(e),
            }
        }

        match self.user_config_path.as_deref() {
            Some(path) if path.exists() => BridgeConfig::load_from_file(path),
            _ => Ok(BridgeConfig::default()),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Recognised variables:
    /// - HOSTBRIDGE_RUNTIMES_DIR
    /// - HOSTBRIDGE_RID
    /// - HOSTBRIDGE_SIZE_POLICY (worst-case | exact)
    /// - HOSTBRIDGE_LOG
    fn apply_env_overrides(&self, mut config: BridgeConfig) -> ConfigResult<BridgeConfig> {
        if let Ok(dir) = env::var("HOSTBRIDGE_RUNTIMES_DIR") {
            config.runtimes.get_or_insert_with(Default::default).dir = Some(PathBuf::from(dir));
        }

        if let Ok(rid) = env::var("HOSTBRIDGE_RID") {
            RuntimeIdentifier::parse(&rid)?;
            config.runtimes.get_or_insert_with(Default::default).rid = Some(rid);
        }

        if let Ok(policy) = env::var("HOSTBRIDGE_SIZE_POLICY") {
            let policy: SizePolicy = policy.parse()?;
            config.transfer.get_or_insert_with(Default::default).size_policy = Some(policy);
        }

        if let Ok(filter) = env::var("HOSTBRIDGE_LOG") {
            config.logging.get_or_insert_with(Default::default).filter = Some(filter);
        }

        Ok(config)
    }

    /// Get the user configuration directory (~/.hostbridge)
    pub fn user_config_dir() -> ConfigResult<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Ok(home.join(".hostbridge"))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Get the project root directory
    pub fn project_root(&self) -> Option<&Path> {
        self.project_root.as_deref()
    }

    /// Check if a project config file was found
    pub fn is_project(&self) -> bool {
        self.project_root.is_some()
    }

    /// Runtime layout, with relative directories resolved against the project root
    pub fn runtime_layout(&self) -> RuntimeLayout {
        let dir = self
            .bridge
            .runtimes_dir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RUNTIMES_DIR));

        match (&self.project_root, dir.is_relative()) {
            (Some(root), true) => RuntimeLayout::new(root.join(dir)),
            _ => RuntimeLayout::new(dir),
        }
    }

    /// Effective runtime identifier (configured, else the running platform)
    pub fn runtime_identifier(&self) -> ConfigResult<RuntimeIdentifier> {
        match self.bridge.rid() {
            Some(rid) => RuntimeIdentifier::parse(rid),
            None => RuntimeIdentifier::current(),
        }
    }

    pub fn size_policy(&self) -> SizePolicy {
        self.bridge.size_policy()
    }

    pub fn text(&self) -> Option<&str> {
        self.bridge.text()
    }

    pub fn log_filter(&self) -> Option<&str> {
        self.bridge.log_filter()
    }
}
