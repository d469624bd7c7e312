//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Layout
//!
//! Top-level settings apply to every SSO instance. Each `[sso.<name>]` table
//! describes one instance (start URL + region) and may carry per-account and
//! per-role overrides for the default region and tags.
//!
//! # Validation
//!
//! Values are validated after parsing: actions and store names must be known,
//! the exec template must hold exactly one `%s`, and account keys must be
//! valid account identifiers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::AccountId;

/// Default profile template.
pub const DEFAULT_PROFILE_FORMAT: &str = "{{ .AccountIdPad }}:{{ .RoleName }}";

/// Known URL actions.
pub const URL_ACTIONS: &[&str] = &["print", "open", "exec", "clip"];

/// Known secure store backends.
pub const SECURE_STORES: &[&str] = &["keychain", "secret-service", "wincred", "file"];

/// Top-level settings.
///
/// # Example
///
/// ```toml
/// default_sso = "Default"
/// url_action = "open"
/// secure_store = "file"
///
/// [sso.Default]
/// start_url = "https://example.awsapps.com/start"
/// sso_region = "us-east-1"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// SSO instance used when none is selected explicitly
    pub default_sso: Option<String>,

    /// Global default region
    pub default_region: Option<String>,

    /// How the verification URI is delivered
    pub url_action: Option<String>,

    /// Browser for the `open` action
    pub browser: Option<String>,

    /// Command template for the `exec` action
    pub url_exec_command: Option<Vec<String>>,

    /// Secure store backend
    pub secure_store: Option<String>,

    /// Profile name template
    pub profile_format: Option<String>,

    /// Lifetime of the role cache in hours
    pub cache_refresh_hours: Option<u64>,

    /// Maximum number of history entries
    pub history_limit: Option<usize>,

    /// Tags exported to the child environment
    pub env_var_tags: Vec<String>,

    /// SSO instances by name
    pub sso: BTreeMap<String, SsoInstance>,
}

impl Settings {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(action) = &self.url_action {
            if !URL_ACTIONS.contains(&action.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid url_action '{}', must be one of: {}",
                    action,
                    URL_ACTIONS.join(", ")
                )));
            }
            if action == "exec" && self.url_exec_command.is_none() {
                return Err(ConfigError::InvalidValue(
                    "url_action 'exec' requires url_exec_command".into(),
                ));
            }
        }

        if let Some(command) = &self.url_exec_command {
            validate_exec_template(command)?;
        }

        if let Some(store) = &self.secure_store {
            if !SECURE_STORES.contains(&store.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid secure_store '{}', must be one of: {}",
                    store,
                    SECURE_STORES.join(", ")
                )));
            }
        }

        if let Some(format) = &self.profile_format {
            if format.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "profile_format cannot be empty".into(),
                ));
            }
        }

        if let Some(default) = &self.default_sso {
            if !self.sso.is_empty() && !self.sso.contains_key(default) {
                return Err(ConfigError::InvalidValue(format!(
                    "default_sso '{}' is not a configured SSO instance",
                    default
                )));
            }
        }

        for (name, instance) in &self.sso {
            instance.validate(name)?;
        }

        Ok(())
    }
}

/// Check that an exec template has exactly one `%s` placeholder.
pub fn validate_exec_template(command: &[String]) -> Result<(), ConfigError> {
    if command.is_empty() {
        return Err(ConfigError::InvalidValue(
            "url_exec_command cannot be empty".into(),
        ));
    }
    let placeholders: usize = command.iter().map(|arg| arg.matches("%s").count()).sum();
    if placeholders != 1 {
        return Err(ConfigError::InvalidValue(format!(
            "url_exec_command must contain exactly one %s, found {}",
            placeholders
        )));
    }
    Ok(())
}

/// One SSO instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SsoInstance {
    /// Federation portal URL
    pub start_url: String,

    /// Region hosting the identity provider
    pub sso_region: String,

    /// Instance-wide default region
    pub default_region: Option<String>,

    /// Per-account overrides keyed by account id
    pub accounts: BTreeMap<String, AccountConfig>,
}

impl SsoInstance {
    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if self.start_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue(format!(
                "sso.{}: start_url is required",
                name
            )));
        }
        if self.sso_region.trim().is_empty() {
            return Err(ConfigError::InvalidValue(format!(
                "sso.{}: sso_region is required",
                name
            )));
        }
        for key in self.accounts.keys() {
            key.parse::<AccountId>().map_err(|e| {
                ConfigError::InvalidValue(format!("sso.{}.accounts.{}: {}", name, key, e))
            })?;
        }
        Ok(())
    }

    /// Find the override table for an account, matching padded or unpadded keys.
    pub fn account(&self, account: AccountId) -> Option<&AccountConfig> {
        self.accounts
            .iter()
            .find(|(key, _)| key.parse::<AccountId>().ok() == Some(account))
            .map(|(_, config)| config)
    }
}

/// Per-account overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AccountConfig {
    /// Display name, overrides the remote account name
    pub name: Option<String>,

    pub default_region: Option<String>,

    pub tags: BTreeMap<String, String>,

    /// Per-role overrides keyed by role name
    pub roles: BTreeMap<String, RoleConfig>,
}

/// Per-role overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RoleConfig {
    pub default_region: Option<String>,

    pub tags: BTreeMap<String, String>,
}
