//! secrets::keychain_store
//!
//! OS-native secret backends through the `keyring` crate.
//!
//! # Flavors
//!
//! - `keychain`: macOS Keychain
//! - `secret-service`: Secret Service over D-Bus (GNOME Keyring, KWallet)
//! - `wincred`: Windows Credential Manager, capped at
//!   [`WINCRED_MAX_ENTRY`] bytes per entry
//!
//! Each flavor is only available on its own platform; asking for another
//! one is `BackendUnavailable`.
//!
//! # Feature Flag
//!
//! Only available with the `keychain` feature flag. Without it, every flavor
//! fails at construction.

#[cfg(feature = "keychain")]
use keyring::Entry;

use super::traits::{SecretBackend, SecretError};

/// Service name for every keyring entry.
pub const KEYRING_SERVICE: &str = "ssoenv";

/// Per-entry payload limit of the Windows credential vault.
pub const WINCRED_MAX_ENTRY: usize = 2000;

/// Which native store to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyringFlavor {
    Keychain,
    SecretService,
    WinCred,
}

impl KeyringFlavor {
    pub fn name(self) -> &'static str {
        match self {
            KeyringFlavor::Keychain => "keychain",
            KeyringFlavor::SecretService => "secret-service",
            KeyringFlavor::WinCred => "wincred",
        }
    }

    /// Whether this flavor is the native store of the running platform.
    pub fn is_native(self) -> bool {
        match self {
            KeyringFlavor::Keychain => cfg!(target_os = "macos"),
            KeyringFlavor::WinCred => cfg!(target_os = "windows"),
            KeyringFlavor::SecretService => {
                cfg!(any(target_os = "linux", target_os = "freebsd", target_os = "openbsd"))
            }
        }
    }
}

/// Keyring-backed secret storage.
#[derive(Debug)]
pub struct KeyringBackend {
    flavor: KeyringFlavor,
    /// Service name for keyring entries
    service: String,
}

#[cfg(feature = "keychain")]
impl KeyringBackend {
    /// Create a backend for the given flavor.
    ///
    /// # Errors
    ///
    /// Returns `SecretError::BackendUnavailable` if the flavor is not native
    /// to this platform.
    pub fn new(flavor: KeyringFlavor) -> Result<Self, SecretError> {
        Self::with_service(flavor, KEYRING_SERVICE)
    }

    /// Create a backend with a custom service name.
    pub fn with_service(
        flavor: KeyringFlavor,
        service: impl Into<String>,
    ) -> Result<Self, SecretError> {
        if !flavor.is_native() {
            return Err(SecretError::BackendUnavailable(format!(
                "'{}' is not available on this platform",
                flavor.name()
            )));
        }
        Ok(Self {
            flavor,
            service: service.into(),
        })
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    fn entry(&self, key: &str) -> Result<Entry, SecretError> {
        Entry::new(&self.service, key).map_err(map_keyring_error)
    }
}

#[cfg(feature = "keychain")]
fn map_keyring_error(err: keyring::Error) -> SecretError {
    match err {
        keyring::Error::NoStorageAccess(e) => SecretError::Locked(e.to_string()),
        keyring::Error::PlatformFailure(e) => SecretError::BackendUnavailable(e.to_string()),
        keyring::Error::BadEncoding(_) => {
            SecretError::CorruptStore("keyring entry is not valid".into())
        }
        keyring::Error::TooLong(attr, limit) => {
            SecretError::WriteError(format!("{} exceeds the limit of {}", attr, limit))
        }
        other => SecretError::ReadError(other.to_string()),
    }
}

#[cfg(feature = "keychain")]
impl SecretBackend for KeyringBackend {
    fn name(&self) -> &str {
        self.flavor.name()
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SecretError> {
        match self.entry(key)?.get_secret() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(map_keyring_error(e)),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), SecretError> {
        self.entry(key)?.set_secret(value).map_err(map_keyring_error)
    }

    fn delete(&self, key: &str) -> Result<(), SecretError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(map_keyring_error(e)),
        }
    }

    fn max_entry_size(&self) -> Option<usize> {
        match self.flavor {
            KeyringFlavor::WinCred => Some(WINCRED_MAX_ENTRY),
            _ => None,
        }
    }
}

// Stub implementation when keychain feature is disabled
#[cfg(not(feature = "keychain"))]
impl KeyringBackend {
    /// Always fails when compiled without the `keychain` feature.
    pub fn new(flavor: KeyringFlavor) -> Result<Self, SecretError> {
        Err(SecretError::BackendUnavailable(format!(
            "{} support not enabled (compile with --features keychain)",
            flavor.name()
        )))
    }
}

#[cfg(not(feature = "keychain"))]
impl SecretBackend for KeyringBackend {
    fn name(&self) -> &str {
        self.flavor.name()
    }

    fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, SecretError> {
        Err(SecretError::BackendUnavailable(self.service.clone()))
    }

    fn set(&self, _key: &str, _value: &[u8]) -> Result<(), SecretError> {
        Err(SecretError::BackendUnavailable(self.service.clone()))
    }

    fn delete(&self, _key: &str) -> Result<(), SecretError> {
        Err(SecretError::BackendUnavailable(self.service.clone()))
    }
}
