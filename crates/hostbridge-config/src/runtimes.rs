//! Per-platform runtime directory layout
//!
//! Host libraries are provisioned ahead of time by a separate tool into a
//! directory tree keyed by runtime identifier:
//!
//! ```text
//! runtimes/
//!   linux-x64/libnethost.so
//!   osx-arm64/libnethost.dylib
//!   win-x64/nethost.dll
//! ```
//!
//! This module only knows that layout. It never fetches anything.

use crate::{ConfigError, ConfigResult};
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Default root of the runtime tree, relative to the project root
pub const DEFAULT_RUNTIMES_DIR: &str = "runtimes";

/// File name of the native host library on the current platform
#[cfg(target_os = "windows")]
pub const HOST_LIBRARY_FILE: &str = "nethost.dll";
#[cfg(target_os = "macos")]
pub const HOST_LIBRARY_FILE: &str = "libnethost.dylib";
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
pub const HOST_LIBRARY_FILE: &str = "libnethost.so";

/// A runtime identifier such as `linux-x64` or `linux-musl-arm64`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuntimeIdentifier(String);

impl RuntimeIdentifier {
    /// Parse and validate a runtime identifier
    ///
    /// Identifiers are lowercase, dash-separated, with at least an OS and an
    /// architecture segment.
    pub fn parse(s: &str) -> ConfigResult<Self> {
        let valid_segment =
            |seg: &str| !seg.is_empty() && seg.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        let segments: Vec<&str> = s.split('-').collect();
        if segments.len() < 2 || !segments.iter().all(|seg| valid_segment(seg)) {
            return Err(ConfigError::InvalidRuntimeIdentifier(s.to_string()));
        }
        Ok(Self(s.to_ascii_lowercase()))
    }

    /// The identifier of the platform this process runs on
    pub fn current() -> ConfigResult<Self> {
        let os = match std::env::consts::OS {
            "linux" if cfg!(target_env = "musl") => "linux-musl",
            "linux" => "linux",
            "macos" => "osx",
            "windows" => "win",
            "freebsd" => "freebsd",
            other => {
                return Err(ConfigError::UnsupportedPlatform {
                    os: other.to_string(),
                    arch: std::env::consts::ARCH.to_string(),
                })
            }
        };
        let arch = match std::env::consts::ARCH {
            "x86_64" => "x64",
            "x86" => "x86",
            "aarch64" => "arm64",
            "arm" => "arm",
            "s390x" => "s390x",
            other => {
                return Err(ConfigError::UnsupportedPlatform {
                    os: std::env::consts::OS.to_string(),
                    arch: other.to_string(),
                })
            }
        };
        Ok(Self(format!("{}-{}", os, arch)))
    }

    /// Extract the identifier from a host package title
    ///
    /// Package titles follow `runtime.<rid>.<package id>`, for example
    /// `runtime.linux-x64.Microsoft.NETCore.DotNetAppHost`.
    pub fn from_package_title(title: &str) -> Option<Self> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let pattern = PATTERN.get_or_init(|| {
            Regex::new(r"^runtime\.(\w+(?:-\w+)*)\.").expect("package title pattern is valid")
        });
        let captures = pattern.captures(title)?;
        Self::parse(captures.get(1)?.as_str()).ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RuntimeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The provisioned runtime tree rooted at some directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeLayout {
    root: PathBuf,
}

impl RuntimeLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the files for one platform
    pub fn platform_dir(&self, rid: &RuntimeIdentifier) -> PathBuf {
        self.root.join(rid.as_str())
    }

    /// Expected path of the native host library for one platform
    pub fn host_library_path(&self, rid: &RuntimeIdentifier) -> PathBuf {
        self.platform_dir(rid).join(HOST_LIBRARY_FILE)
    }

    /// Identifiers that have a platform directory under the root, sorted
    ///
    /// A missing root is treated as an empty tree.
    pub fn installed(&self) -> ConfigResult<Vec<RuntimeIdentifier>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut found = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(rid) = entry
                .file_name()
                .to_str()
                .and_then(|name| RuntimeIdentifier::parse(name).ok())
            {
                found.push(rid);
            }
        }
        found.sort();
        Ok(found)
    }
}

impl Default for RuntimeLayout {
    fn default() -> Self {
        Self::new(DEFAULT_RUNTIMES_DIR)
    }
}
