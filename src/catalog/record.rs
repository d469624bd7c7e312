//! catalog::record
//!
//! One assumable role, with its tags and rendered profile name.
//!
//! # Tags
//!
//! Every record carries the built-in tags `AccountID` (padded), `AccountName`
//! and `Role`, then the configured account tags, then the configured role
//! tags. Later layers win.
//!
//! # Template variables
//!
//! `AccountId`, `AccountIdPad`, `AccountName`, `RoleName`, `Arn`, `SSO`, and
//! every tag by name. Built-in variables shadow tags of the same name.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::errors::CatalogError;
use super::template::ProfileTemplate;
use crate::core::config::{Config, SsoInstance};
use crate::core::types::{AccountId, RoleArn};

/// Prefix of environment variables generated from tags.
pub const ENV_TAG_PREFIX: &str = "AWS_SSO_TAG_";

/// A role the principal may assume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRecord {
    pub account_id: AccountId,
    #[serde(default)]
    pub account_name: String,
    pub role_name: String,
    pub arn: RoleArn,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    pub profile: String,
    #[serde(default)]
    pub env_tags: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_region: Option<String>,
}

impl RoleRecord {
    /// `<account>/<role>`, used in messages.
    pub fn label(&self) -> String {
        format!("{}/{}", self.account_id, self.role_name)
    }
}

/// Inputs shared by every record of one catalog build.
pub(crate) struct RecordContext<'a> {
    pub sso_name: &'a str,
    pub instance: &'a SsoInstance,
    pub config: &'a Config,
    pub template: &'a ProfileTemplate,
}

impl RecordContext<'_> {
    /// Build a record for one discovered role.
    pub fn record(
        &self,
        account_id: AccountId,
        remote_account_name: &str,
        role_name: &str,
    ) -> Result<RoleRecord, CatalogError> {
        let arn = RoleArn::new(account_id, role_name)
            .map_err(|e| CatalogError::InvalidRole(e.to_string()))?;
        let account_config = self.instance.account(account_id);
        let role_config = account_config.and_then(|a| a.roles.get(role_name));

        let account_name = account_config
            .and_then(|a| a.name.clone())
            .unwrap_or_else(|| remote_account_name.to_string());

        let mut tags = BTreeMap::new();
        tags.insert("AccountID".to_string(), account_id.padded());
        tags.insert("AccountName".to_string(), account_name.clone());
        tags.insert("Role".to_string(), role_name.to_string());
        if let Some(account) = account_config {
            tags.extend(account.tags.clone());
        }
        if let Some(role) = role_config {
            tags.extend(role.tags.clone());
        }

        let mut vars = tags.clone();
        vars.insert("AccountId".to_string(), account_id.value().to_string());
        vars.insert("AccountIdPad".to_string(), account_id.padded());
        vars.insert("AccountName".to_string(), account_name.clone());
        vars.insert("RoleName".to_string(), role_name.to_string());
        vars.insert("Arn".to_string(), arn.to_string());
        vars.insert("SSO".to_string(), self.sso_name.to_string());
        let profile = self.template.render(&vars)?;

        let env_tags = self
            .config
            .env_var_tags()
            .iter()
            .filter_map(|name| {
                tags.get(name)
                    .map(|value| (env_tag_name(name), value.clone()))
            })
            .collect();

        Ok(RoleRecord {
            account_id,
            account_name,
            role_name: role_name.to_string(),
            arn,
            tags,
            profile,
            env_tags,
            default_region: self.config.region_for(self.instance, account_id, role_name),
        })
    }
}

/// Environment variable carrying a tag: `AWS_SSO_TAG_<NAME>`, uppercased,
/// with anything outside `[A-Z0-9_]` replaced by `_`.
pub fn env_tag_name(tag: &str) -> String {
    let suffix: String = tag
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{}{}", ENV_TAG_PREFIX, suffix)
}
