//! secrets
//!
//! Secure storage for client registrations, access tokens, and role
//! credentials.
//!
//! # Architecture
//!
//! Bytes are stored through the [`SecretBackend`] trait, which has multiple
//! implementations:
//!
//! - [`KeyringBackend`]: OS keychain, Secret Service, or Windows credential
//!   vault (optional, feature-gated)
//! - [`EncryptedFileBackend`]: `age`-encrypted files under `~/.ssoenv/secure/`
//! - [`MemoryBackend`]: in-process, for tests
//!
//! [`SecureStore`] sits on top and exposes typed save/get/delete for each
//! record family. Backends that cap entry size are chunked transparently.
//!
//! # Security
//!
//! - Secrets are **never** logged or included in error messages
//! - File store uses 0600 permissions on Unix (owner read/write only)
//! - All file writes are atomic (temp file + rename)
//!
//! # Example
//!
//! ```
//! use ssoenv::secrets::{MemoryBackend, SecureStore};
//!
//! let store = SecureStore::new(Box::new(MemoryBackend::new())).unwrap();
//! assert!(store.get_token("us-east-1|https://example/start").is_err());
//! ```

mod blob;
mod chunked;
mod file_store;
mod keychain_store;
mod memory;
mod passphrase;
mod store;
mod traits;

pub use blob::StorageBlob;
pub use chunked::{ChunkedBackend, LENGTH_PREFIX};
pub use file_store::EncryptedFileBackend;
pub use keychain_store::{KeyringBackend, KeyringFlavor, KEYRING_SERVICE, WINCRED_MAX_ENTRY};
pub use memory::MemoryBackend;
pub use passphrase::{EnvOrPromptPassphrase, PassphraseProvider, StaticPassphrase, PASSPHRASE_ENV};
pub use store::{store_key, SecureStore, RECORD_KEY};
pub use traits::{SecretBackend, SecretError};

use std::sync::Arc;

use crate::core::paths::SsoPaths;

/// Create a backend by name.
///
/// # Backends
///
/// - `"file"`: [`EncryptedFileBackend`] under `paths.secure_dir()`
/// - `"keychain"`, `"secret-service"`, `"wincred"`: [`KeyringBackend`]
///   (requires the `keychain` feature and the matching platform)
///
/// # Errors
///
/// - Unknown backend name
/// - Keyring backend without the `keychain` feature or on another platform
pub fn create_backend(
    name: &str,
    paths: &SsoPaths,
    passphrase: Arc<dyn PassphraseProvider>,
) -> Result<Box<dyn SecretBackend>, SecretError> {
    match name {
        "file" => Ok(Box::new(EncryptedFileBackend::new(
            paths.secure_dir(),
            passphrase,
        ))),
        "keychain" => Ok(Box::new(KeyringBackend::new(KeyringFlavor::Keychain)?)),
        "secret-service" => Ok(Box::new(KeyringBackend::new(KeyringFlavor::SecretService)?)),
        "wincred" => Ok(Box::new(KeyringBackend::new(KeyringFlavor::WinCred)?)),
        other => Err(SecretError::BackendUnavailable(format!(
            "unknown secure store: '{}' (valid: keychain, secret-service, wincred, file)",
            other
        ))),
    }
}

/// Create a [`SecureStore`] over the named backend.
pub fn create_store(
    name: &str,
    paths: &SsoPaths,
    passphrase: Arc<dyn PassphraseProvider>,
) -> Result<SecureStore, SecretError> {
    let backend = create_backend(name, paths, passphrase)?;
    tracing::debug!(backend = backend.name(), "opened secure store");
    SecureStore::new(backend)
}
