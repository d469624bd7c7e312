//! catalog::errors
//!
//! Error types for the role catalog.

use std::path::PathBuf;

use thiserror::Error;

use crate::auth::AuthError;
use crate::core::errors::ErrorKind;
use crate::identity::IdentityError;

/// Errors from building, persisting, or querying the role catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Two or more roles render to the same profile name.
    #[error("duplicate profile names: {0}")]
    Conflict(String),

    /// The profile template is malformed or references an unknown variable.
    #[error("invalid profile_format: {0}")]
    Template(String),

    #[error("role not found: {0}")]
    NotFound(String),

    #[error("profile '{profile}' is ambiguous: {candidates}")]
    Ambiguous { profile: String, candidates: String },

    #[error("failed to write cache file '{path}': {message}")]
    CacheWrite { path: PathBuf, message: String },

    #[error("timed out waiting for cache lock '{0}'")]
    LockTimeout(PathBuf),

    #[error("cache lock error: {0}")]
    Lock(String),

    /// The provider returned a role that cannot form an ARN.
    #[error("invalid role from identity provider: {0}")]
    InvalidRole(String),

    #[error("failed to list roles: {0}")]
    Remote(#[from] IdentityError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl CatalogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::Conflict(_) | CatalogError::Template(_) => ErrorKind::Config,
            CatalogError::NotFound(_) | CatalogError::Ambiguous { .. } => ErrorKind::Input,
            CatalogError::CacheWrite { .. }
            | CatalogError::LockTimeout(_)
            | CatalogError::Lock(_) => ErrorKind::Internal,
            CatalogError::InvalidRole(_) => ErrorKind::Remote,
            CatalogError::Remote(e) => e.kind(),
            CatalogError::Auth(e) => e.kind(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(CatalogError::Conflict("x".into()).kind(), ErrorKind::Config);
        assert_eq!(CatalogError::Template("x".into()).kind(), ErrorKind::Config);
        assert_eq!(CatalogError::NotFound("x".into()).kind(), ErrorKind::Input);
        assert_eq!(
            CatalogError::Remote(IdentityError::Network("down".into())).kind(),
            ErrorKind::Remote
        );
        assert_eq!(
            CatalogError::Auth(AuthError::AccessDenied).kind(),
            ErrorKind::AccessDenied
        );
    }
}
