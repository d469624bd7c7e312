//! cli::commands::flush
//!
//! Delete the cached access token and/or role credentials for the selected
//! SSO instance.
//!
//! Role credentials are keyed by ARN only, so the instance's roles are taken
//! from the cached catalog. Without a cached catalog every stored role
//! credential is removed.

use std::collections::BTreeSet;

use anyhow::Result;

use crate::catalog::CacheFile;
use crate::cli::args::FlushKind;
use crate::cli::context::{Context, Session};
use crate::core::types::RoleArn;
use crate::secrets::{SecretError, SecureStore};

pub fn flush(ctx: &Context, kind: FlushKind) -> Result<()> {
    let session = Session::open(ctx)?;

    if kind.token() {
        let key = session.auth().store_key();
        if ignore_missing(session.store.delete_token(&key))? {
            eprintln!("Deleted the access token for {}.", session.sso_name);
        }
    }

    if kind.creds() {
        let scope = instance_arns(ctx, session.sso_name);
        let removed = flush_credentials(&session.store, scope.as_ref())?;
        eprintln!(
            "Deleted {} role credential(s) for {}.",
            removed, session.sso_name
        );
    }
    Ok(())
}

/// ARNs in the cached catalog for `sso_name`, if one is cached.
fn instance_arns(ctx: &Context, sso_name: &str) -> Option<BTreeSet<String>> {
    let cache = CacheFile::load(&ctx.paths.cache_file());
    match cache.catalog(sso_name)? {
        Ok(catalog) => Some(catalog.records().map(|r| r.arn.to_string()).collect()),
        Err(e) => {
            tracing::warn!(error = %e, "ignoring unreadable cached catalog");
            None
        }
    }
}

fn flush_credentials(store: &SecureStore, scope: Option<&BTreeSet<String>>) -> Result<usize, SecretError> {
    let mut removed = 0;
    for key in store.role_credential_arns()? {
        if scope.is_some_and(|arns| !arns.contains(&key)) {
            continue;
        }
        let arn = match key.parse::<RoleArn>() {
            Ok(arn) => arn,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "skipping malformed credential key");
                continue;
            }
        };
        if ignore_missing(store.delete_role_credentials(&arn))? {
            removed += 1;
        }
    }
    Ok(removed)
}

/// `Ok(true)` if something was deleted, `Ok(false)` if it was already gone.
fn ignore_missing(result: Result<(), SecretError>) -> Result<bool, SecretError> {
    match result {
        Ok(()) => Ok(true),
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => Err(e),
    }
}
