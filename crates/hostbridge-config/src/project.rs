//! Project Configuration (hostbridge.toml)
//!
//! Handles the configuration file stored next to the host application.
//! The same schema is used for the user-level file; see [`crate::loader`].

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Configuration from hostbridge.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// Where provisioned host runtimes live
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtimes: Option<RuntimesConfig>,

    /// String transfer settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer: Option<TransferConfig>,

    /// Log filter settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

/// Runtime directory configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct RuntimesConfig {
    /// Root of the per-platform tree (default: "runtimes")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    /// Runtime identifier override, e.g. "linux-x64"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rid: Option<String>,
}

/// String transfer configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct TransferConfig {
    /// How buffer sizes are requested from allocators
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_policy: Option<SizePolicy>,

    /// Text held by the managed side and returned by every strategy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// An `EnvFilter` directive string, e.g. "hostbridge_runtime=debug"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

/// Sizing rule used when the managed side asks an allocator for a UTF-8 buffer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SizePolicy {
    /// Request the maximum UTF-8 byte count for the UTF-16 length, `(n + 1) * 3`.
    #[default]
    WorstCase,
    /// Count the encoded length first and request exactly that many bytes.
    Exact,
}

impl SizePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SizePolicy::WorstCase => "worst-case",
            SizePolicy::Exact => "exact",
        }
    }
}

impl fmt::Display for SizePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SizePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "worst-case" | "worst_case" | "worstcase" => Ok(SizePolicy::WorstCase),
            "exact" => Ok(SizePolicy::Exact),
            other => Err(ConfigError::InvalidValue {
                field: "transfer.size_policy".to_string(),
                reason: format!("unknown size policy '{}'", other),
            }),
        }
    }
}

impl BridgeConfig {
    /// Load configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(runtimes) = &self.runtimes {
            if let Some(dir) = &runtimes.dir {
                if dir.as_os_str().is_empty() {
                    return Err(ConfigError::InvalidValue {
                        field: "runtimes.dir".to_string(),
                        reason: "directory cannot be empty".to_string(),
                    });
                }
            }
            if let Some(rid) = &runtimes.rid {
                crate::RuntimeIdentifier::parse(rid)?;
            }
        }

        if let Some(text) = self.transfer.as_ref().and_then(|t| t.text.as_ref()) {
            // The managed side stores the length as a 32-bit signed integer
            if text.encode_utf16().count() > i32::MAX as usize {
                return Err(ConfigError::InvalidValue {
                    field: "transfer.text".to_string(),
                    reason: "text is longer than a managed string can hold".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Overlay `other` on top of `self`; fields set in `other` win.
    pub fn merge(mut self, other: BridgeConfig) -> BridgeConfig {
        if let Some(theirs) = other.runtimes {
            let ours = self.runtimes.get_or_insert_with(Default::default);
            if theirs.dir.is_some() {
                ours.dir = theirs.dir;
            }
            if theirs.rid.is_some() {
                ours.rid = theirs.rid;
            }
        }
        if let Some(theirs) = other.transfer {
            let ours = self.transfer.get_or_insert_with(Default::default);
            if theirs.size_policy.is_some() {
                ours.size_policy = theirs.size_policy;
            }
            if theirs.text.is_some() {
                ours.text = theirs.text;
            }
        }
        if let Some(theirs) = other.logging {
            let ours = self.logging.get_or_insert_with(Default::default);
            if theirs.filter.is_some() {
                ours.filter = theirs.filter;
            }
        }
        self
    }

    /// Get the configured size policy
    pub fn size_policy(&self) -> SizePolicy {
        self.transfer
            .as_ref()
            .and_then(|t| t.size_policy)
            .unwrap_or_default()
    }

    /// Get the configured managed-side text, if any
    pub fn text(&self) -> Option<&str> {
        self.transfer.as_ref().and_then(|t| t.text.as_deref())
    }

    /// Get the configured log filter, if any
    pub fn log_filter(&self) -> Option<&str> {
        self.logging.as_ref().and_then(|l| l.filter.as_deref())
    }

    /// Get the configured runtimes directory, if any
    pub fn runtimes_dir(&self) -> Option<&Path> {
        self.runtimes.as_ref().and_then(|r| r.dir.as_deref())
    }

    /// Get the configured runtime identifier, if any
    pub fn rid(&self) -> Option<&str> {
        self.runtimes.as_ref().and_then(|r| r.rid.as_deref())
    }
}
