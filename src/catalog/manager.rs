//! catalog::manager
//!
//! Loads the role catalog from the cache file, refreshing it from the
//! identity provider when it is missing, expired, or a refresh is forced.
//!
//! # Refresh protocol
//!
//! 1. Read the cache; a fresh entry is returned without touching the network
//! 2. Take the [`CacheLock`]
//! 3. Re-read the cache, since another process may have refreshed it while
//!    this one waited
//! 4. Obtain a token, walk `ListAccounts` x `ListAccountRoles`, retrying the
//!    whole walk on transient failure so partial results are never kept
//! 5. Build the catalog and write the cache atomically

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;

use super::cache::CacheFile;
use super::errors::CatalogError;
use super::lock::{CacheLock, DEFAULT_LOCK_TIMEOUT};
use super::retry::{retry_remote, RetryConfig};
use super::roles::{AccountRoles, RoleCatalog};
use crate::auth::{AuthMachine, BrowserLauncher};
use crate::core::config::{Config, SsoInstance};
use crate::core::paths::SsoPaths;
use crate::core::records::AccessToken;
use crate::identity::{IdentityClient, IdentityError};

/// Owns the cache file and lock for catalog reads and refreshes.
pub struct CatalogManager<'a> {
    client: &'a dyn IdentityClient,
    config: &'a Config,
    cache_path: PathBuf,
    lock_path: PathBuf,
    retry: RetryConfig,
    lock_timeout: Duration,
}

impl<'a> CatalogManager<'a> {
    pub fn new(client: &'a dyn IdentityClient, config: &'a Config, paths: &SsoPaths) -> Self {
        Self {
            client,
            config,
            cache_path: paths.cache_file(),
            lock_path: paths.cache_lock(),
            retry: RetryConfig::default(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// The catalog for `sso_name`, refreshing it if needed.
    pub async fn catalog(
        &self,
        sso_name: &str,
        instance: &SsoInstance,
        auth: &AuthMachine<'_>,
        launcher: &BrowserLauncher,
    ) -> Result<RoleCatalog, CatalogError> {
        if let Some(catalog) = self.fresh_cached(sso_name)? {
            tracing::debug!(sso = sso_name, roles = catalog.len(), "using cached catalog");
            return Ok(catalog);
        }

        let _lock = CacheLock::acquire(&self.lock_path, self.lock_timeout).await?;
        if let Some(catalog) = self.fresh_cached(sso_name)? {
            tracing::debug!(sso = sso_name, "catalog refreshed by another process");
            return Ok(catalog);
        }
        self.refresh_locked(sso_name, instance, auth, launcher).await
    }

    /// Rebuild the catalog for `sso_name` regardless of its expiry.
    pub async fn refresh(
        &self,
        sso_name: &str,
        instance: &SsoInstance,
        auth: &AuthMachine<'_>,
        launcher: &BrowserLauncher,
    ) -> Result<RoleCatalog, CatalogError> {
        let _lock = CacheLock::acquire(&self.lock_path, self.lock_timeout).await?;
        self.refresh_locked(sso_name, instance, auth, launcher).await
    }

    /// Cached catalog for `sso_name`, if present and not expired.
    pub fn fresh_cached(&self, sso_name: &str) -> Result<Option<RoleCatalog>, CatalogError> {
        let cache = CacheFile::load(&self.cache_path);
        if cache.is_stale(sso_name, Utc::now()) {
            return Ok(None);
        }
        cache.catalog(sso_name).transpose()
    }

    /// Recently used role ARNs, most recent first.
    pub fn history(&self) -> Vec<String> {
        CacheFile::load(&self.cache_path).history
    }

    /// Record a use of `arn` in the history.
    pub async fn add_history(&self, arn: &str) -> Result<(), CatalogError> {
        let _lock = CacheLock::acquire(&self.lock_path, self.lock_timeout).await?;
        let mut cache = CacheFile::load(&self.cache_path);
        cache.add_history(arn, self.config.history_limit());
        cache.save(&self.cache_path)
    }

    async fn refresh_locked(
        &self,
        sso_name: &str,
        instance: &SsoInstance,
        auth: &AuthMachine<'_>,
        launcher: &BrowserLauncher,
    ) -> Result<RoleCatalog, CatalogError> {
        let token = auth.authenticate(launcher).await?;

        tracing::info!(sso = sso_name, "refreshing role catalog");
        let client = self.client;
        let token = &token;
        let discovered = retry_remote(&self.retry, "list roles", move || walk(client, token)).await?;

        let catalog = RoleCatalog::build(sso_name, instance, self.config, &discovered)?;
        let expires_at =
            Utc::now() + chrono::Duration::hours(self.config.cache_refresh_hours() as i64);

        let mut cache = CacheFile::load(&self.cache_path);
        cache.set_catalog(&catalog, expires_at);
        cache.save(&self.cache_path)?;

        tracing::debug!(sso = sso_name, roles = catalog.len(), "role catalog saved");
        Ok(catalog)
    }
}

/// One complete pass over every account and its roles.
async fn walk(
    client: &dyn IdentityClient,
    token: &AccessToken,
) -> Result<Vec<AccountRoles>, IdentityError> {
    let accounts = client.list_accounts(token).await?;
    let mut discovered = Vec::with_capacity(accounts.len());
    for account in accounts {
        let roles = client.list_account_roles(token, account.account_id).await?;
        discovered.push((account, roles));
    }
    Ok(discovered)
}
