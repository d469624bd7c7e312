//! inject::resolver
//!
//! Turns user input into a catalog role.
//!
//! Precedence: profile, then ARN, then (account, role). The account and role
//! must be given together; one without the other is an input error even
//! when a profile or ARN is also present.

use crate::catalog::{CatalogError, RoleCatalog, RoleRecord};
use crate::core::types::{AccountId, RoleArn};

use super::errors::InjectError;

/// Raw role selection from the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleSelector {
    pub profile: Option<String>,
    pub arn: Option<String>,
    pub account: Option<String>,
    pub role: Option<String>,
}

/// A validated role selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleQuery {
    Profile(String),
    Arn(RoleArn),
    AccountRole(AccountId, String),
}

impl RoleSelector {
    pub fn by_profile(profile: impl Into<String>) -> Self {
        Self {
            profile: Some(profile.into()),
            ..Self::default()
        }
    }

    pub fn by_arn(arn: impl Into<String>) -> Self {
        Self {
            arn: Some(arn.into()),
            ..Self::default()
        }
    }

    pub fn by_account_and_role(account: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            account: Some(account.into()),
            role: Some(role.into()),
            ..Self::default()
        }
    }

    /// Validate the selection and pick the highest-precedence form.
    ///
    /// # Errors
    ///
    /// Returns `InjectError::Input` for a partial account/role pair, an
    /// unparseable ARN or account, or an empty selection.
    pub fn query(&self) -> Result<RoleQuery, InjectError> {
        let account = non_empty(&self.account);
        let role = non_empty(&self.role);
        if account.is_some() != role.is_some() {
            return Err(InjectError::Input(
                "Please specify both --account and --role".into(),
            ));
        }

        if let Some(profile) = non_empty(&self.profile) {
            return Ok(RoleQuery::Profile(profile.to_string()));
        }
        if let Some(arn) = non_empty(&self.arn) {
            let arn = arn
                .parse::<RoleArn>()
                .map_err(|e| InjectError::Input(e.to_string()))?;
            return Ok(RoleQuery::Arn(arn));
        }
        if let (Some(account), Some(role)) = (account, role) {
            let account = account
                .parse::<AccountId>()
                .map_err(|e| InjectError::Input(e.to_string()))?;
            RoleArn::new(account, role).map_err(|e| InjectError::Input(e.to_string()))?;
            return Ok(RoleQuery::AccountRole(account, role.to_string()));
        }

        Err(InjectError::Input(
            "no role selected: use --profile, --arn, or --account with --role".into(),
        ))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Find the catalog record for a query.
///
/// # Errors
///
/// A role missing from the catalog is an input error that points at
/// `ssoenv cache`; an ambiguous profile is an input error as well.
pub fn resolve<'c>(catalog: &'c RoleCatalog, query: &RoleQuery) -> Result<&'c RoleRecord, InjectError> {
    let found = match query {
        RoleQuery::Profile(profile) => catalog.by_profile(profile),
        RoleQuery::Arn(arn) => catalog.by_arn(arn),
        RoleQuery::AccountRole(account, role) => catalog.by_account_and_role(*account, role),
    };
    found.map_err(|e| match e {
        CatalogError::NotFound(what) => InjectError::Input(format!(
            "{} is not available in SSO instance '{}'. Run 'ssoenv cache' to refresh the role list.",
            what,
            catalog.sso_name()
        )),
        other => InjectError::Catalog(other),
    })
}
