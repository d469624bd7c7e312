//! core::paths
//!
//! Centralized path routing for ssoenv storage locations.
//!
//! # Storage Layout
//!
//! All on-disk state lives under one base directory, `~/.ssoenv/` unless
//! `SSOENV_HOME` points elsewhere:
//! - `config.toml` - Canonical configuration location
//! - `cache.json` - Role catalog cache and history
//! - `cache.lock` - Advisory lock guarding catalog refreshes
//! - `secure/` - Encrypted-file secure store
//!
//! # Example
//!
//! ```
//! use ssoenv::core::paths::SsoPaths;
//! use std::path::PathBuf;
//!
//! let paths = SsoPaths::new(PathBuf::from("/home/me/.ssoenv"));
//! assert_eq!(paths.cache_file(), PathBuf::from("/home/me/.ssoenv/cache.json"));
//! ```

use std::path::{Path, PathBuf};

/// Environment variable overriding the base directory.
pub const HOME_ENV: &str = "SSOENV_HOME";

/// Centralized path routing for ssoenv storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsoPaths {
    base: PathBuf,
}

impl SsoPaths {
    pub fn new(base: PathBuf) -> Self {
        Self { base }
    }

    /// Resolve the base directory from `SSOENV_HOME` or the home directory.
    ///
    /// Returns `None` when neither is available.
    pub fn discover() -> Option<Self> {
        if let Ok(dir) = std::env::var(HOME_ENV) {
            if !dir.is_empty() {
                return Some(Self::new(PathBuf::from(dir)));
            }
        }
        dirs::home_dir().map(|home| Self::new(home.join(".ssoenv")))
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn config_file(&self) -> PathBuf {
        self.base.join("config.toml")
    }

    pub fn cache_file(&self) -> PathBuf {
        self.base.join("cache.json")
    }

    pub fn cache_lock(&self) -> PathBuf {
        self.base.join("cache.lock")
    }

    pub fn secure_dir(&self) -> PathBuf {
        self.base.join("secure")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_under_base() {
        let paths = SsoPaths::new(PathBuf::from("/tmp/x"));
        assert_eq!(paths.config_file(), PathBuf::from("/tmp/x/config.toml"));
        assert_eq!(paths.cache_file(), PathBuf::from("/tmp/x/cache.json"));
        assert_eq!(paths.cache_lock(), PathBuf::from("/tmp/x/cache.lock"));
        assert_eq!(paths.secure_dir(), PathBuf::from("/tmp/x/secure"));
    }
}
