//! core::config
//!
//! Configuration schema and loading.
//!
//! # Locations
//!
//! Searched in order:
//! 1. `$SSOENV_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/ssoenv/config.toml`
//! 3. `~/.ssoenv/config.toml` (canonical location)
//!
//! A missing file is not an error: defaults are used and commands that need
//! an SSO instance fail when they try to select one.
//!
//! # Precedence
//!
//! CLI flags override file values; file values override built-in defaults.
//! Flags are applied by the CLI layer, not here.
//!
//! # Example
//!
//! ```no_run
//! use ssoenv::core::config::Config;
//!
//! let config = Config::load().unwrap();
//! let (name, sso) = config.select_sso(None).unwrap();
//! println!("{} -> {}", name, sso.start_url);
//! ```

pub mod schema;

pub use schema::{AccountConfig, RoleConfig, Settings, SsoInstance, DEFAULT_PROFILE_FORMAT};

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::errors::ErrorKind;
use crate::core::types::AccountId;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "SSOENV_CONFIG";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("no SSO instance configured")]
    NoSsoInstance,

    #[error("unknown SSO instance '{0}'")]
    UnknownSso(String),

    #[error("multiple SSO instances configured ({0}); select one with --sso or default_sso")]
    AmbiguousSso(String),
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConfigError::ReadError { .. } => ErrorKind::Internal,
            _ => ErrorKind::Config,
        }
    }
}

/// Loaded configuration.
///
/// Accessors apply built-in defaults for anything the file leaves unset.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub settings: Settings,
    /// Path the settings were read from (if any)
    path: Option<PathBuf>,
}

impl Config {
    /// Build a config from already-parsed settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if validation fails.
    pub fn from_settings(settings: Settings) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self {
            settings,
            path: None,
        })
    }

    /// Load configuration from the standard locations.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed or is
    /// invalid.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::search_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from an explicit path. The file must exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        settings.validate()?;

        tracing::debug!(path = %path.display(), "loaded config");
        Ok(Self {
            settings,
            path: Some(path.to_path_buf()),
        })
    }

    /// First existing config file in search order.
    fn search_path() -> Option<PathBuf> {
        // 1. Check $SSOENV_CONFIG
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        // 2. Check $XDG_CONFIG_HOME/ssoenv/config.toml
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("ssoenv/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        // 3. Check ~/.ssoenv/config.toml
        let path = crate::core::paths::SsoPaths::discover()?.config_file();
        path.exists().then_some(path)
    }

    /// Path the configuration was loaded from.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    // =========================================================================
    // Accessor methods with defaults
    // =========================================================================

    /// Defaults to "open".
    pub fn url_action(&self) -> &str {
        self.settings.url_action.as_deref().unwrap_or("open")
    }

    pub fn browser(&self) -> Option<&str> {
        self.settings.browser.as_deref()
    }

    pub fn url_exec_command(&self) -> Option<&[String]> {
        self.settings.url_exec_command.as_deref()
    }

    /// Secure store backend.
    ///
    /// Defaults to the platform's native store when keychain support is
    /// compiled in, otherwise to the encrypted file.
    pub fn secure_store(&self) -> &str {
        self.settings
            .secure_store
            .as_deref()
            .unwrap_or(default_secure_store())
    }

    pub fn profile_format(&self) -> &str {
        self.settings
            .profile_format
            .as_deref()
            .unwrap_or(DEFAULT_PROFILE_FORMAT)
    }

    /// Defaults to 24 hours.
    pub fn cache_refresh_hours(&self) -> u64 {
        self.settings.cache_refresh_hours.unwrap_or(24)
    }

    /// Defaults to 10 entries.
    pub fn history_limit(&self) -> usize {
        self.settings.history_limit.unwrap_or(10)
    }

    pub fn env_var_tags(&self) -> &[String] {
        &self.settings.env_var_tags
    }

    /// Select the SSO instance to use.
    ///
    /// Order: the explicit selector (flag or `AWS_SSO`), then `default_sso`,
    /// then the single configured instance.
    ///
    /// # Errors
    ///
    /// - `UnknownSso` if the selector names no configured instance
    /// - `NoSsoInstance` if nothing is configured
    /// - `AmbiguousSso` if several are configured and none is selected
    pub fn select_sso(&self, explicit: Option<&str>) -> Result<(&str, &SsoInstance), ConfigError> {
        let wanted = explicit
            .filter(|s| !s.is_empty())
            .or(self.settings.default_sso.as_deref());

        if let Some(name) = wanted {
            return self
                .settings
                .sso
                .get_key_value(name)
                .map(|(k, v)| (k.as_str(), v))
                .ok_or_else(|| ConfigError::UnknownSso(name.to_string()));
        }

        let mut iter = self.settings.sso.iter();
        match (iter.next(), iter.next()) {
            (None, _) => Err(ConfigError::NoSsoInstance),
            (Some((name, sso)), None) => Ok((name.as_str(), sso)),
            _ => Err(ConfigError::AmbiguousSso(
                self.settings
                    .sso
                    .keys()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", "),
            )),
        }
    }

    /// Default region for a role: role, then account, then SSO instance,
    /// then the global default.
    pub fn region_for(&self, sso: &SsoInstance, account: AccountId, role: &str) -> Option<String> {
        let account_config = sso.account(account);
        account_config
            .and_then(|a| a.roles.get(role))
            .and_then(|r| r.default_region.clone())
            .or_else(|| account_config.and_then(|a| a.default_region.clone()))
            .or_else(|| sso.default_region.clone())
            .or_else(|| self.settings.default_region.clone())
    }
}

fn default_secure_store() -> &'static str {
    if !cfg!(feature = "keychain") {
        "file"
    } else if cfg!(target_os = "macos") {
        "keychain"
    } else if cfg!(target_os = "windows") {
        "wincred"
    } else {
        "secret-service"
    }
}
