//! secrets::traits
//!
//! Backend trait and error taxonomy for secure storage.
//!
//! # Design
//!
//! A [`SecretBackend`] is a flat byte-oriented key-value store. Backends
//! that cap the size of a single entry report it through
//! [`SecretBackend::max_entry_size`] and are wrapped in the chunking adapter
//! by [`SecureStore`](super::SecureStore).
//!
//! # Security
//!
//! Implementations MUST:
//! - Never log, print, or include stored bytes in error messages
//! - Be thread-safe (Send + Sync)

use thiserror::Error;

use crate::core::errors::ErrorKind;

/// Errors from secure storage operations.
///
/// Note: Error messages intentionally do not include secret values.
#[derive(Debug, Error)]
pub enum SecretError {
    /// The backend cannot be reached or is not compiled in.
    #[error("secure store backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The backend is reachable but locked.
    #[error("secure store is locked: {0}")]
    Locked(String),

    /// No record under the given key.
    #[error("not found in secure store: {0}")]
    NotFound(String),

    /// Stored bytes could not be decoded.
    #[error("secure store is corrupt: {0}")]
    CorruptStore(String),

    /// The encrypted file could not be opened with the given passphrase.
    #[error("secure store authentication failed: {0}")]
    AuthenticationRequired(String),

    /// The passphrase prompt was cancelled.
    #[error("aborted: {0}")]
    Aborted(String),

    /// Failed to read from the backend.
    #[error("failed to read secure store: {0}")]
    ReadError(String),

    /// Failed to write to the backend.
    #[error("failed to write secure store: {0}")]
    WriteError(String),
}

impl SecretError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SecretError::Aborted(_) => ErrorKind::UserAbort,
            _ => ErrorKind::Store,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SecretError::NotFound(_))
    }
}

/// A flat key-value backend holding opaque bytes.
///
/// # Keys
///
/// Keys are plain strings such as `aws-sso-cli-records` or, for chunked
/// backends, `aws-sso-cli-records_0`. Implementations store them as-is.
pub trait SecretBackend: Send + Sync {
    /// Short backend name for diagnostics.
    fn name(&self) -> &str;

    /// Read an entry.
    ///
    /// Returns `Ok(None)` if the entry does not exist.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SecretError>;

    /// Write an entry, replacing any previous value.
    fn set(&self, key: &str, value: &[u8]) -> Result<(), SecretError>;

    /// Delete an entry.
    ///
    /// Returns `Ok(())` even if the entry did not exist.
    fn delete(&self, key: &str) -> Result<(), SecretError>;

    /// Largest value a single entry can hold, if capped.
    fn max_entry_size(&self) -> Option<usize> {
        None
    }
}
