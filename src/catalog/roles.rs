//! catalog::roles
//!
//! The indexed set of roles for one SSO instance.
//!
//! # Invariants
//!
//! - Every profile name is unique; a build that would produce duplicates
//!   fails with `CatalogError::Conflict` naming every colliding role
//! - A catalog is immutable once built; refreshing replaces it whole

use std::collections::BTreeMap;

use super::errors::CatalogError;
use super::record::{RecordContext, RoleRecord};
use super::template::ProfileTemplate;
use crate::core::config::{Config, SsoInstance};
use crate::core::types::{AccountId, RoleArn};
use crate::identity::{Account, Role};

/// Roles discovered for one account.
pub type AccountRoles = (Account, Vec<Role>);

/// Roles of one SSO instance, indexed by ARN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleCatalog {
    sso_name: String,
    records: BTreeMap<RoleArn, RoleRecord>,
}

impl RoleCatalog {
    /// Build a catalog from the roles discovered remotely, applying the
    /// configured tags, regions and profile template.
    ///
    /// # Errors
    ///
    /// - `CatalogError::Template` if the profile template is invalid
    /// - `CatalogError::Conflict` if two roles render to the same profile
    pub fn build(
        sso_name: &str,
        instance: &SsoInstance,
        config: &Config,
        discovered: &[AccountRoles],
    ) -> Result<Self, CatalogError> {
        let template = ProfileTemplate::parse(config.profile_format())?;
        let ctx = RecordContext {
            sso_name,
            instance,
            config,
            template: &template,
        };

        let mut records = Vec::new();
        for (account, roles) in discovered {
            for role in roles {
                records.push(ctx.record(account.account_id, &account.account_name, &role.role_name)?);
            }
        }
        Self::from_records(sso_name, records)
    }

    /// Assemble a catalog from existing records, e.g. from the cache file.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Conflict` if profile names collide.
    pub fn from_records(
        sso_name: &str,
        records: impl IntoIterator<Item = RoleRecord>,
    ) -> Result<Self, CatalogError> {
        let records: BTreeMap<RoleArn, RoleRecord> = records
            .into_iter()
            .map(|record| (record.arn.clone(), record))
            .collect();
        check_unique_profiles(records.values())?;
        Ok(Self {
            sso_name: sso_name.to_string(),
            records,
        })
    }

    pub fn sso_name(&self) -> &str {
        &self.sso_name
    }

    /// All records, ordered by ARN.
    pub fn records(&self) -> impl Iterator<Item = &RoleRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn by_arn(&self, arn: &RoleArn) -> Result<&RoleRecord, CatalogError> {
        self.records
            .get(arn)
            .ok_or_else(|| CatalogError::NotFound(arn.to_string()))
    }

    pub fn by_account_and_role(
        &self,
        account: AccountId,
        role_name: &str,
    ) -> Result<&RoleRecord, CatalogError> {
        let arn = RoleArn::new(account, role_name)
            .map_err(|e| CatalogError::NotFound(e.to_string()))?;
        self.by_arn(&arn)
    }

    /// Look up a profile. An exact match wins; otherwise a single
    /// case-insensitive match is accepted and several are ambiguous.
    pub fn by_profile(&self, profile: &str) -> Result<&RoleRecord, CatalogError> {
        if let Some(record) = self.records.values().find(|r| r.profile == profile) {
            return Ok(record);
        }

        let matches: Vec<&RoleRecord> = self
            .records
            .values()
            .filter(|r| r.profile.eq_ignore_ascii_case(profile))
            .collect();
        match matches.as_slice() {
            [] => Err(CatalogError::NotFound(format!("profile '{}'", profile))),
            [record] => Ok(record),
            many => Err(CatalogError::Ambiguous {
                profile: profile.to_string(),
                candidates: many
                    .iter()
                    .map(|r| r.profile.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }
}

fn check_unique_profiles<'a>(
    records: impl Iterator<Item = &'a RoleRecord>,
) -> Result<(), CatalogError> {
    let mut by_profile: BTreeMap<&str, Vec<&RoleRecord>> = BTreeMap::new();
    for record in records {
        by_profile.entry(&record.profile).or_default().push(record);
    }

    let conflicts: Vec<String> = by_profile
        .iter()
        .filter(|(_, owners)| owners.len() > 1)
        .map(|(profile, owners)| {
            let labels: Vec<String> = owners.iter().map(|r| r.label()).collect();
            format!("'{}' is produced by {}", profile, labels.join(" and "))
        })
        .collect();

    if conflicts.is_empty() {
        Ok(())
    } else {
        Err(CatalogError::Conflict(conflicts.join("; ")))
    }
}
