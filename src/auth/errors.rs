//! auth::errors
//!
//! Authentication error types for the device flow.
//!
//! # Design
//!
//! Error messages MUST NOT contain tokens or client secrets. Variants wrap
//! the lower-level error where one exists so the stable [`ErrorKind`] can be
//! recovered from it.
//!
//! # Example
//!
//! ```
//! use ssoenv::auth::AuthError;
//! use ssoenv::core::errors::ErrorKind;
//!
//! let err = AuthError::AuthRequired("us-east-1|https://example/start".to_string());
//! assert_eq!(err.kind(), ErrorKind::AuthRequired);
//! assert!(err.to_string().contains("ssoenv login"));
//! ```

use thiserror::Error;

use super::browser::LauncherError;
use crate::core::errors::ErrorKind;
use crate::identity::IdentityError;
use crate::secrets::SecretError;

/// Errors from authentication operations.
///
/// # Security
///
/// Error messages intentionally do not include token values.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No valid token and the flow cannot run without a terminal.
    #[error("not authenticated for '{0}'. Run 'ssoenv login' interactively.")]
    AuthRequired(String),

    /// The device code expired before the user approved it.
    #[error("device authorization expired. Please try again.")]
    VerificationExpired,

    /// The user denied the request in the browser.
    #[error("authorization denied by user")]
    AccessDenied,

    /// Interrupted by the user.
    #[error("aborted: {0}")]
    UserAbort(String),

    /// The identity provider failed.
    #[error("identity provider error: {0}")]
    Remote(#[from] IdentityError),

    /// The secure store failed.
    #[error(transparent)]
    Store(#[from] SecretError),

    /// The verification URI could not be delivered.
    #[error(transparent)]
    Launcher(#[from] LauncherError),
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::AuthRequired(_) => ErrorKind::AuthRequired,
            AuthError::VerificationExpired => ErrorKind::VerificationExpired,
            AuthError::AccessDenied => ErrorKind::AccessDenied,
            AuthError::UserAbort(_) => ErrorKind::UserAbort,
            AuthError::Remote(_) => ErrorKind::Remote,
            AuthError::Store(e) => e.kind(),
            AuthError::Launcher(e) => e.kind(),
        }
    }

    /// Check if running `ssoenv login` would resolve this error.
    pub fn needs_reauth(&self) -> bool {
        matches!(
            self,
            AuthError::AuthRequired(_) | AuthError::VerificationExpired
        )
    }
}
