//! CLI configuration
//!
//! Resolves the effective configuration from an explicit `--config` file or
//! by discovery from the working directory, and picks the log filter.

use anyhow::{Context, Result};
use hostbridge_config::{Config, ConfigLoader};
use std::env;
use std::path::Path;

/// Filter used when neither the flag, the environment nor a config file names one
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Load configuration from `explicit` or by walking up from the working directory
pub fn load(explicit: Option<&Path>) -> Result<Config> {
    let mut loader = ConfigLoader::new();
    match explicit {
        Some(path) => loader
            .load_from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => {
            let cwd = env::current_dir().context("Failed to read working directory")?;
            loader
                .load_from_directory(&cwd)
                .context("Failed to load configuration")
        }
    }
}

/// Log filter in precedence order: `--log`/HOSTBRIDGE_LOG, config file, default
pub fn log_filter(flag: Option<&str>, config: Option<&Config>) -> String {
    flag.or_else(|| config.and_then(|c| c.log_filter()))
        .unwrap_or(DEFAULT_LOG_FILTER)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostbridge_config::{BridgeConfig, LoggingConfig};
    use std::fs;
    use tempfile::TempDir;

    fn config_with_filter(filter: &str) -> Config {
        Config {
            bridge: BridgeConfig {
                logging: Some(LoggingConfig {
                    filter: Some(filter.to_string()),
                }),
                ..Default::default()
            },
            project_root: None,
        }
    }

    #[test]
    fn test_log_filter_default() {
        assert_eq!(log_filter(None, None), "warn");
        assert_eq!(log_filter(None, Some(&Config::default())), "warn");
    }

    #[test]
    fn test_log_filter_from_config() {
        let config = config_with_filter("hostbridge=debug");
        assert_eq!(log_filter(None, Some(&config)), "hostbridge=debug");
    }

    #[test]
    fn test_log_filter_flag_wins() {
        let config = config_with_filter("hostbridge=debug");
        assert_eq!(log_filter(Some("trace"), Some(&config)), "trace");
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hostbridge.toml");
        fs::write(&path, "[transfer]\ntext = \"from file\"\n").unwrap();

        let config = load(Some(&path)).unwrap();
        assert_eq!(config.text(), Some("from file"));
        assert_eq!(config.project_root.as_deref(), Some(dir.path()));
    }

    #[test]
    fn test_load_missing_file_has_context() {
        let err = load(Some(Path::new("/nonexistent/hostbridge.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to load configuration"));
    }
}
