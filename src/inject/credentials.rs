//! inject::credentials
//!
//! Role credentials from the secure store, or fresh from the identity
//! provider when the stored ones are missing or inside the safety margin.
//!
//! # Invariants
//!
//! Credentials handed back always expire after `now + SAFETY_MARGIN_SECS`.
//! A token the portal rejects is discarded and the fetch is retried once
//! with a freshly authenticated token.

use crate::auth::{AuthMachine, BrowserLauncher};
use crate::core::records::RoleCredentials;
use crate::core::types::RoleArn;
use crate::identity::{IdentityClient, IdentityError};
use crate::secrets::SecureStore;

use super::errors::InjectError;

/// Sources for role credentials.
pub struct CredentialSource<'a> {
    pub client: &'a dyn IdentityClient,
    pub store: &'a SecureStore,
    pub auth: &'a AuthMachine<'a>,
    pub launcher: &'a BrowserLauncher,
}

impl CredentialSource<'_> {
    /// Valid credentials for `arn`.
    pub async fn credentials(&self, arn: &RoleArn) -> Result<RoleCredentials, InjectError> {
        match self.store.get_role_credentials(arn) {
            Ok(credentials) if !credentials.is_expired() => {
                tracing::debug!(%arn, "using cached role credentials");
                return Ok(credentials);
            }
            Ok(_) => tracing::debug!(%arn, "cached role credentials expired"),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }

        let credentials = match self.fetch(arn).await {
            Err(InjectError::Remote(IdentityError::Unauthorized(_))) => {
                tracing::warn!("access token rejected, discarding it and re-authenticating");
                if let Err(store_err) = self.store.delete_token(&self.auth.store_key()) {
                    if !store_err.is_not_found() {
                        return Err(store_err.into());
                    }
                }
                self.fetch(arn).await?
            }
            result => result?,
        };

        if credentials.is_expired() {
            return Err(InjectError::Remote(IdentityError::Api {
                status: 200,
                message: format!("credentials for {} expire too soon", arn),
            }));
        }
        self.store.save_role_credentials(arn, &credentials)?;
        tracing::debug!(%arn, expires_at = %credentials.expires_rfc3339(), "obtained role credentials");
        Ok(credentials)
    }

    async fn fetch(&self, arn: &RoleArn) -> Result<RoleCredentials, InjectError> {
        let token = self.auth.authenticate(self.launcher).await?;
        Ok(self
            .client
            .get_role_credentials(&token, arn.account(), arn.role_name())
            .await?)
    }
}
