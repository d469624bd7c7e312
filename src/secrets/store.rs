//! secrets::store
//!
//! Typed persistence of the three record families.
//!
//! # Transactions
//!
//! Every operation loads the full [`StorageBlob`], applies one change, and
//! writes it back while holding a process-wide mutex. Concurrent processes
//! are not coordinated; the backend is the source of truth.
//!
//! # Keys
//!
//! | Family | Key |
//! |---|---|
//! | registration | SSO region |
//! | token | [`store_key`]`(region, start_url)` |
//! | role credentials | canonical role ARN |

use std::sync::{Mutex, PoisonError};

use super::blob::StorageBlob;
use super::chunked::ChunkedBackend;
use super::traits::{SecretBackend, SecretError};
use crate::core::records::{AccessToken, ClientRegistration, RoleCredentials};
use crate::core::types::RoleArn;

/// Backend key holding the serialized blob.
pub const RECORD_KEY: &str = "aws-sso-cli-records";

static STORE_LOCK: Mutex<()> = Mutex::new(());

/// Key of an access token: `region|start_url`.
pub fn store_key(region: &str, start_url: &str) -> String {
    format!("{}|{}", region, start_url)
}

/// Secure key-value container over a single backend.
pub struct SecureStore {
    backend: Box<dyn SecretBackend>,
}

impl SecureStore {
    /// Wrap a backend, adding chunking if it caps entry size.
    ///
    /// # Errors
    ///
    /// Returns `SecretError::BackendUnavailable` if the cap is too small to
    /// chunk.
    pub fn new(backend: Box<dyn SecretBackend>) -> Result<Self, SecretError> {
        let backend: Box<dyn SecretBackend> = match backend.max_entry_size() {
            Some(max) => {
                tracing::debug!(backend = backend.name(), max, "chunking secure store entries");
                Box::new(ChunkedBackend::new(backend, max)?)
            }
            None => backend,
        };
        Ok(Self { backend })
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    fn load(&self) -> Result<StorageBlob, SecretError> {
        match self.backend.get(RECORD_KEY)? {
            Some(bytes) => StorageBlob::from_bytes(&bytes),
            None => Ok(StorageBlob::default()),
        }
    }

    fn persist(&self, blob: &StorageBlob) -> Result<(), SecretError> {
        self.backend.set(RECORD_KEY, &blob.to_bytes()?)
    }

    /// Run a read-only closure against the current blob.
    fn read<T>(&self, f: impl FnOnce(&StorageBlob) -> T) -> Result<T, SecretError> {
        let _guard = STORE_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let blob = self.load()?;
        Ok(f(&blob))
    }

    /// Load, modify, and write back the blob as one step.
    fn update<T>(
        &self,
        f: impl FnOnce(&mut StorageBlob) -> Result<T, SecretError>,
    ) -> Result<T, SecretError> {
        let _guard = STORE_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let mut blob = self.load()?;
        let result = f(&mut blob)?;
        self.persist(&blob)?;
        Ok(result)
    }

    // =========================================================================
    // Client registrations
    // =========================================================================

    pub fn save_registration(
        &self,
        region: &str,
        registration: &ClientRegistration,
    ) -> Result<(), SecretError> {
        self.update(|blob| {
            blob.registrations
                .insert(region.to_string(), registration.clone());
            Ok(())
        })
    }

    pub fn get_registration(&self, region: &str) -> Result<ClientRegistration, SecretError> {
        self.read(|blob| blob.registrations.get(region).cloned())?
            .ok_or_else(|| SecretError::NotFound(format!("registration for {}", region)))
    }

    pub fn delete_registration(&self, region: &str) -> Result<(), SecretError> {
        self.update(|blob| {
            blob.registrations
                .remove(region)
                .map(|_| ())
                .ok_or_else(|| SecretError::NotFound(format!("registration for {}", region)))
        })
    }

    // =========================================================================
    // Access tokens
    // =========================================================================

    pub fn save_token(&self, key: &str, token: &AccessToken) -> Result<(), SecretError> {
        self.update(|blob| {
            blob.tokens.insert(key.to_string(), token.clone());
            Ok(())
        })
    }

    pub fn get_token(&self, key: &str) -> Result<AccessToken, SecretError> {
        self.read(|blob| blob.tokens.get(key).cloned())?
            .ok_or_else(|| SecretError::NotFound(format!("token for {}", key)))
    }

    pub fn delete_token(&self, key: &str) -> Result<(), SecretError> {
        self.update(|blob| {
            blob.tokens
                .remove(key)
                .map(|_| ())
                .ok_or_else(|| SecretError::NotFound(format!("token for {}", key)))
        })
    }

    // =========================================================================
    // Role credentials
    // =========================================================================

    pub fn save_role_credentials(
        &self,
        arn: &RoleArn,
        credentials: &RoleCredentials,
    ) -> Result<(), SecretError> {
        self.update(|blob| {
            blob.role_credentials
                .insert(arn.to_string(), credentials.clone());
            Ok(())
        })
    }

    pub fn get_role_credentials(&self, arn: &RoleArn) -> Result<RoleCredentials, SecretError> {
        let key = arn.to_string();
        self.read(|blob| blob.role_credentials.get(&key).cloned())?
            .ok_or_else(|| SecretError::NotFound(format!("credentials for {}", key)))
    }

    pub fn delete_role_credentials(&self, arn: &RoleArn) -> Result<(), SecretError> {
        let key = arn.to_string();
        self.update(|blob| {
            blob.role_credentials
                .remove(&key)
                .map(|_| ())
                .ok_or_else(|| SecretError::NotFound(format!("credentials for {}", key)))
        })
    }

    /// ARNs with stored role credentials.
    pub fn role_credential_arns(&self) -> Result<Vec<String>, SecretError> {
        self.read(|blob| blob.role_credentials.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::AccountId;
    use crate::secrets::memory::MemoryBackend;
    use chrono::{Duration, Utc};

    fn store() -> (MemoryBackend, SecureStore) {
        let raw = MemoryBackend::new();
        let store = SecureStore::new(Box::new(raw.clone())).unwrap();
        (raw, store)
    }

    fn registration() -> ClientRegistration {
        let now = Utc::now();
        ClientRegistration {
            client_id: "cid".into(),
            client_secret: "sec".into(),
            issued_at: now,
            expires_at: now + Duration::hours(1),
        }
    }

    fn credentials(role: &str) -> RoleCredentials {
        RoleCredentials {
            account_id: AccountId::new(42).unwrap(),
            role_name: role.into(),
            access_key_id: "AKIA".into(),
            secret_access_key: "secret".into(),
            session_token: "session".into(),
            expires_at: Utc::now() + Duration::hours(1),
        }
    }

    #[test]
    fn store_key_format() {
        assert_eq!(
            store_key("us-west-1", "https://testing.example/start"),
            "us-west-1|https://testing.example/start"
        );
    }

    #[test]
    fn empty_store_reports_not_found() {
        let (_raw, store) = store();
        assert!(store.get_registration("us-east-1").unwrap_err().is_not_found());
        assert!(store.get_token("k").unwrap_err().is_not_found());
    }

    #[test]
    fn registration_roundtrip_and_delete() {
        let (raw, store) = store();
        let reg = registration();
        store.save_registration("us-east-1", &reg).unwrap();
        assert_eq!(store.get_registration("us-east-1").unwrap(), reg);
        assert_eq!(raw.keys(), vec![RECORD_KEY.to_string()]);

        store.delete_registration("us-east-1").unwrap();
        assert!(store.get_registration("us-east-1").is_err());
        assert!(store
            .delete_registration("us-east-1")
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn delete_is_persisted() {
        let (raw, store) = store();
        store.save_registration("r", &registration()).unwrap();
        store.delete_registration("r").unwrap();

        let reopened = SecureStore::new(Box::new(raw)).unwrap();
        assert!(reopened.get_registration("r").is_err());
    }

    #[test]
    fn families_do_not_clobber_each_other() {
        let (_raw, store) = store();
        let arn = RoleArn::new(AccountId::new(42).unwrap(), "admin").unwrap();
        store.save_registration("r", &registration()).unwrap();
        store.save_role_credentials(&arn, &credentials("admin")).unwrap();

        assert!(store.get_registration("r").is_ok());
        assert_eq!(store.get_role_credentials(&arn).unwrap().role_name, "admin");
        assert_eq!(
            store.role_credential_arns().unwrap(),
            vec!["arn:aws:iam::000000000042:role/admin".to_string()]
        );
    }

    #[test]
    fn capped_backend_is_chunked() {
        let raw = MemoryBackend::with_cap(64);
        let store = SecureStore::new(Box::new(raw.clone())).unwrap();
        store.save_registration("us-east-1", &registration()).unwrap();

        let keys = raw.keys();
        assert!(keys.len() > 1);
        assert!(keys.iter().all(|k| k.starts_with("aws-sso-cli-records_")));
        assert!(store.get_registration("us-east-1").is_ok());
    }
}
