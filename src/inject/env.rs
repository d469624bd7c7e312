//! inject::env
//!
//! The child process environment.
//!
//! The parent environment is copied and the role variables are overlaid on
//! the copy; the parent process environment itself is never modified.

use std::collections::BTreeMap;

use crate::catalog::RoleRecord;
use crate::core::records::RoleCredentials;

use super::errors::InjectError;

/// Variables whose presence in the parent environment blocks injection.
pub const CONFLICTING_VARS: [&str; 3] = ["AWS_ACCESS_KEY_ID", "AWS_SECRET_ACCESS_KEY", "AWS_PROFILE"];

/// Snapshot of the current process environment. Entries that are not valid
/// UTF-8 are skipped.
pub fn parent_environment() -> BTreeMap<String, String> {
    std::env::vars_os()
        .filter_map(|(key, value)| match (key.into_string(), value.into_string()) {
            (Ok(key), Ok(value)) => Some((key, value)),
            (key, _) => {
                tracing::debug!(?key, "skipping non UTF-8 environment entry");
                None
            }
        })
        .collect()
}

/// Fail if the parent already carries credentials or a profile.
pub fn check_environment(parent: &BTreeMap<String, String>) -> Result<(), InjectError> {
    let present: Vec<&str> = CONFLICTING_VARS
        .iter()
        .copied()
        .filter(|name| parent.contains_key(*name))
        .collect();
    if present.is_empty() {
        Ok(())
    } else {
        Err(InjectError::EnvironmentConflict(present.join(", ")))
    }
}

/// What goes into the child environment besides the parent copy.
pub struct Injection<'a> {
    pub sso_name: &'a str,
    pub record: &'a RoleRecord,
    pub credentials: &'a RoleCredentials,
    /// Leave `AWS_DEFAULT_REGION` alone and export an empty
    /// `AWS_SSO_DEFAULT_REGION`.
    pub suppress_region: bool,
}

/// Parent copy plus the role variables.
pub fn build_environment(
    parent: &BTreeMap<String, String>,
    injection: &Injection<'_>,
) -> BTreeMap<String, String> {
    let Injection {
        sso_name,
        record,
        credentials,
        suppress_region,
    } = injection;

    let mut overlay: BTreeMap<String, String> = BTreeMap::new();
    overlay.insert("AWS_ACCESS_KEY_ID".into(), credentials.access_key_id.clone());
    overlay.insert(
        "AWS_SECRET_ACCESS_KEY".into(),
        credentials.secret_access_key.clone(),
    );
    overlay.insert("AWS_SESSION_TOKEN".into(), credentials.session_token.clone());
    overlay.insert("AWS_SSO_ACCOUNT_ID".into(), credentials.account_id.padded());
    overlay.insert("AWS_SSO_ROLE_NAME".into(), credentials.role_name.clone());
    overlay.insert(
        "AWS_SSO_SESSION_EXPIRATION".into(),
        credentials.expires_rfc3339(),
    );
    overlay.insert("AWS_SSO_ROLE_ARN".into(), record.arn.to_string());
    overlay.insert("AWS_SSO".into(), sso_name.to_string());
    overlay.insert("AWS_SSO_PROFILE".into(), record.profile.clone());

    if *suppress_region {
        overlay.insert("AWS_SSO_DEFAULT_REGION".into(), String::new());
    } else if let Some(region) = &record.default_region {
        overlay.insert("AWS_DEFAULT_REGION".into(), region.clone());
        overlay.insert("AWS_SSO_DEFAULT_REGION".into(), region.clone());
    }

    for (name, value) in &record.env_tags {
        overlay.insert(name.clone(), value.clone());
    }

    tracing::debug!(
        variables = ?overlay.keys().collect::<Vec<_>>(),
        "injecting environment"
    );

    let mut env = parent.clone();
    env.extend(overlay);
    env
}
