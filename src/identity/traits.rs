//! identity::traits
//!
//! The boundary to the remote identity provider.
//!
//! # Design
//!
//! The `IdentityClient` trait is async because every operation is network
//! I/O. It is the only seam between the authentication state machine and the
//! outside world, so tests swap in [`MockIdentityClient`](super::mock::MockIdentityClient).
//!
//! Listing operations return the complete sequence: the implementation walks
//! every page, and a failure on any page fails the whole call.

use async_trait::async_trait;
use thiserror::Error;

use crate::core::errors::ErrorKind;
use crate::core::records::{AccessToken, ClientRegistration, DeviceAuthorization, RoleCredentials};
use crate::core::types::AccountId;

/// Errors from identity provider operations.
///
/// The first four variants are device-flow polling signals returned by
/// `create_token`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// The user has not approved the request yet.
    #[error("authorization pending")]
    AuthorizationPending,

    /// Polling too fast.
    #[error("slow down")]
    SlowDown,

    /// The device code expired.
    #[error("device code expired")]
    ExpiredToken,

    /// The user denied the request.
    #[error("access denied")]
    AccessDenied,

    /// The client registration is no longer accepted.
    #[error("invalid client: {0}")]
    InvalidClient(String),

    /// The access token was rejected.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Network or connection error.
    #[error("network error: {0}")]
    Network(String),
}

impl IdentityError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IdentityError::ExpiredToken => ErrorKind::VerificationExpired,
            IdentityError::AccessDenied => ErrorKind::AccessDenied,
            _ => ErrorKind::Remote,
        }
    }

    /// Failures that will not go away by retrying.
    pub fn is_permanent(&self) -> bool {
        match self {
            IdentityError::AccessDenied
            | IdentityError::InvalidClient(_)
            | IdentityError::Unauthorized(_) => true,
            IdentityError::Api { status, .. } => (400..500).contains(status) && *status != 429,
            _ => false,
        }
    }
}

/// An account the principal can access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub account_id: AccountId,
    pub account_name: String,
    pub email_address: String,
}

/// A role the principal can assume in an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub account_id: AccountId,
    pub role_name: String,
}

/// Remote identity provider operations.
#[async_trait]
pub trait IdentityClient: Send + Sync {
    /// Register a public OAuth client.
    async fn register_client(&self, client_name: &str)
        -> Result<ClientRegistration, IdentityError>;

    /// Begin a device authorization for a start URL.
    async fn start_device_authorization(
        &self,
        registration: &ClientRegistration,
        start_url: &str,
    ) -> Result<DeviceAuthorization, IdentityError>;

    /// Exchange a device code for an access token.
    ///
    /// Returns one of the polling signals while the user has not finished.
    async fn create_token(
        &self,
        registration: &ClientRegistration,
        device_code: &str,
    ) -> Result<AccessToken, IdentityError>;

    /// Every account visible to the token.
    async fn list_accounts(&self, token: &AccessToken) -> Result<Vec<Account>, IdentityError>;

    /// Every role visible to the token in one account.
    async fn list_account_roles(
        &self,
        token: &AccessToken,
        account: AccountId,
    ) -> Result<Vec<Role>, IdentityError>;

    /// Temporary credentials for one role.
    async fn get_role_credentials(
        &self,
        token: &AccessToken,
        account: AccountId,
        role_name: &str,
    ) -> Result<RoleCredentials, IdentityError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(IdentityError::AccessDenied.kind(), ErrorKind::AccessDenied);
        assert_eq!(
            IdentityError::ExpiredToken.kind(),
            ErrorKind::VerificationExpired
        );
        assert_eq!(
            IdentityError::Network("reset".into()).kind(),
            ErrorKind::Remote
        );
    }

    #[test]
    fn permanent_errors() {
        assert!(!IdentityError::Network("reset".into()).is_permanent());
        assert!(!IdentityError::Api {
            status: 503,
            message: "busy".into()
        }
        .is_permanent());
        assert!(!IdentityError::Api {
            status: 429,
            message: "throttled".into()
        }
        .is_permanent());
        assert!(IdentityError::Api {
            status: 400,
            message: "bad".into()
        }
        .is_permanent());
        assert!(IdentityError::AccessDenied.is_permanent());
        assert!(IdentityError::Unauthorized("expired".into()).is_permanent());
    }
}
