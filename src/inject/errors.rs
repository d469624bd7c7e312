//! inject::errors

use std::io;

use thiserror::Error;

use crate::auth::AuthError;
use crate::catalog::CatalogError;
use crate::core::errors::ErrorKind;
use crate::identity::IdentityError;
use crate::secrets::SecretError;

/// Errors from resolving a role and running a command with its credentials.
#[derive(Debug, Error)]
pub enum InjectError {
    /// The parent environment already carries AWS credentials or a profile.
    #[error("refusing to run: {0} already set in the environment. Unset it first.")]
    EnvironmentConflict(String),

    /// Contradictory or incomplete role selection.
    #[error("{0}")]
    Input(String),

    #[error("failed to run '{command}': {source}")]
    Spawn { command: String, source: io::Error },

    #[error("failed waiting for '{command}': {source}")]
    Wait { command: String, source: io::Error },

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("failed to get role credentials: {0}")]
    Remote(#[from] IdentityError),

    #[error(transparent)]
    Store(#[from] SecretError),
}

impl InjectError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            InjectError::EnvironmentConflict(_) => ErrorKind::EnvironmentConflict,
            InjectError::Input(_) => ErrorKind::Input,
            InjectError::Spawn { .. } | InjectError::Wait { .. } => ErrorKind::Internal,
            InjectError::Catalog(e) => e.kind(),
            InjectError::Auth(e) => e.kind(),
            InjectError::Remote(e) => e.kind(),
            InjectError::Store(e) => e.kind(),
        }
    }
}
