//! secrets::passphrase
//!
//! Passphrase sources for the encrypted file backend.
//!
//! The provider is passed into [`EncryptedFileBackend`](super::EncryptedFileBackend)
//! at construction. `new_store` tells the provider whether the file is being
//! created, in which case an interactive provider asks twice.

use std::sync::OnceLock;

use secrecy::{ExposeSecret, SecretString};

use super::traits::SecretError;

/// Environment variable holding the file store passphrase.
pub const PASSPHRASE_ENV: &str = "AWS_SSO_FILE_PASSWORD";

/// Supplies the passphrase for the encrypted file backend.
pub trait PassphraseProvider: Send + Sync {
    /// Return the passphrase.
    ///
    /// # Errors
    ///
    /// Returns `SecretError::Aborted` if the user cancels or provides an
    /// empty passphrase, and `SecretError::AuthenticationRequired` if a
    /// new passphrase is not confirmed.
    fn passphrase(&self, new_store: bool) -> Result<SecretString, SecretError>;
}

/// Reads `AWS_SSO_FILE_PASSWORD`, otherwise prompts on the terminal.
///
/// The first successful answer is remembered for the life of the provider.
#[derive(Default)]
pub struct EnvOrPromptPassphrase {
    cached: OnceLock<SecretString>,
}

impl EnvOrPromptPassphrase {
    pub fn new() -> Self {
        Self::default()
    }

    fn prompt(label: &str) -> Result<String, SecretError> {
        rpassword::prompt_password(label)
            .map_err(|e| SecretError::Aborted(format!("passphrase prompt failed: {}", e)))
    }

    fn resolve(new_store: bool) -> Result<SecretString, SecretError> {
        if let Ok(value) = std::env::var(PASSPHRASE_ENV) {
            if !value.is_empty() {
                return Ok(SecretString::from(value));
            }
        }

        if !new_store {
            let value = Self::prompt("Enter password: ")?;
            if value.is_empty() {
                return Err(SecretError::Aborted("empty passphrase".into()));
            }
            return Ok(SecretString::from(value));
        }

        let first = Self::prompt("Select password: ")?;
        if first.is_empty() {
            return Err(SecretError::Aborted("empty passphrase".into()));
        }
        let second = Self::prompt("Verify password: ")?;
        if first != second {
            return Err(SecretError::AuthenticationRequired(
                "passwords do not match".into(),
            ));
        }
        Ok(SecretString::from(first))
    }
}

impl PassphraseProvider for EnvOrPromptPassphrase {
    fn passphrase(&self, new_store: bool) -> Result<SecretString, SecretError> {
        if let Some(cached) = self.cached.get() {
            return Ok(SecretString::from(cached.expose_secret().to_owned()));
        }
        let value = Self::resolve(new_store)?;
        let copy = SecretString::from(value.expose_secret().to_owned());
        let _ = self.cached.set(value);
        Ok(copy)
    }
}

/// A fixed passphrase, for tests and scripted use.
pub struct StaticPassphrase(SecretString);

impl StaticPassphrase {
    pub fn new(passphrase: impl Into<String>) -> Self {
        Self(SecretString::from(passphrase.into()))
    }
}

impl PassphraseProvider for StaticPassphrase {
    fn passphrase(&self, _new_store: bool) -> Result<SecretString, SecretError> {
        if self.0.expose_secret().is_empty() {
            return Err(SecretError::Aborted("empty passphrase".into()));
        }
        Ok(SecretString::from(self.0.expose_secret().to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_passphrase() {
        let provider = StaticPassphrase::new("hunter2");
        assert_eq!(provider.passphrase(true).unwrap().expose_secret(), "hunter2");
        assert_eq!(provider.passphrase(false).unwrap().expose_secret(), "hunter2");
    }

    #[test]
    fn empty_static_passphrase_aborts() {
        let provider = StaticPassphrase::new("");
        let err = provider.passphrase(true).unwrap_err();
        assert!(matches!(err, SecretError::Aborted(_)));
    }

    #[test]
    fn cached_value_is_reused() {
        let provider = EnvOrPromptPassphrase::new();
        let _ = provider.cached.set(SecretString::from("cached".to_string()));
        assert_eq!(provider.passphrase(false).unwrap().expose_secret(), "cached");
    }
}
