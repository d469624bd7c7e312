//! secrets::file_store
//!
//! Encrypted-file secret backend.
//!
//! # Security
//!
//! - Each key is stored as `<dir>/<key>.age`, encrypted with the `age`
//!   passphrase (scrypt) format
//! - File permissions are set to 0600 on Unix (owner read/write only)
//! - All writes are atomic (write to temp file, then rename)
//! - Plaintext never touches the disk and is never logged
//!
//! The passphrase comes from a [`PassphraseProvider`]. Creating a file asks
//! the provider with `new_store = true`.
//!
//! # Cost
//!
//! age calibrates scrypt to roughly a second per operation. Decrypted
//! contents are kept in memory together with the ciphertext they came from,
//! so reading a file this backend wrote or already read costs one file read
//! and a byte comparison. A file replaced by another process no longer
//! matches and is decrypted again. Every write still pays for one
//! encryption.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{Read, Write};
use std::iter;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use age::DecryptError;
use secrecy::{ExposeSecret, SecretBox};

use super::passphrase::PassphraseProvider;
use super::traits::{SecretBackend, SecretError};

/// Backend storing one age-encrypted file per key.
pub struct EncryptedFileBackend {
    /// Directory holding the encrypted files
    dir: PathBuf,
    passphrase: Arc<dyn PassphraseProvider>,
    /// Per key: the ciphertext last seen on disk and its plaintext
    decrypted: Mutex<HashMap<String, (Vec<u8>, SecretBox<Vec<u8>>)>>,
}

impl EncryptedFileBackend {
    pub fn new(dir: PathBuf, passphrase: Arc<dyn PassphraseProvider>) -> Self {
        Self {
            dir,
            passphrase,
            decrypted: Mutex::new(HashMap::new()),
        }
    }

    fn cached(&self, key: &str, ciphertext: &[u8]) -> Option<Vec<u8>> {
        let decrypted = self.decrypted.lock().unwrap_or_else(PoisonError::into_inner);
        match decrypted.get(key) {
            Some((seen, plaintext)) if seen.as_slice() == ciphertext => {
                Some(plaintext.expose_secret().clone())
            }
            _ => None,
        }
    }

    fn remember(&self, key: &str, ciphertext: Vec<u8>, plaintext: Vec<u8>) {
        self.decrypted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), (ciphertext, SecretBox::new(Box::new(plaintext))));
    }

    fn forget(&self, key: &str) {
        self.decrypted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the encrypted file for a key.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.age", key))
    }

    fn encrypt(&self, plaintext: &[u8], new_store: bool) -> Result<Vec<u8>, SecretError> {
        let passphrase = self.passphrase.passphrase(new_store)?;
        let encryptor = age::Encryptor::with_user_passphrase(passphrase);

        let mut encrypted = Vec::new();
        let mut writer = encryptor
            .wrap_output(&mut encrypted)
            .map_err(|e| SecretError::WriteError(format!("cannot start encryption: {}", e)))?;
        writer
            .write_all(plaintext)
            .map_err(|e| SecretError::WriteError(format!("cannot encrypt: {}", e)))?;
        writer
            .finish()
            .map_err(|e| SecretError::WriteError(format!("cannot finish encryption: {}", e)))?;
        Ok(encrypted)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, SecretError> {
        let decryptor = age::Decryptor::new(ciphertext).map_err(map_decrypt_error)?;
        if !decryptor.is_scrypt() {
            return Err(SecretError::CorruptStore(
                "file is not passphrase-encrypted".into(),
            ));
        }

        let passphrase = self.passphrase.passphrase(false)?;
        let identity = age::scrypt::Identity::new(passphrase);
        let mut reader = decryptor
            .decrypt(iter::once(&identity as &dyn age::Identity))
            .map_err(map_decrypt_error)?;

        let mut plaintext = Vec::new();
        reader
            .read_to_end(&mut plaintext)
            .map_err(|e| SecretError::CorruptStore(format!("cannot decrypt: {}", e)))?;
        Ok(plaintext)
    }

    /// Write bytes with atomic rename and owner-only permissions.
    fn write_atomic(&self, path: &Path, contents: &[u8]) -> Result<(), SecretError> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| SecretError::WriteError(format!("cannot create directory: {}", e)))?;

        let temp_path = path.with_extension("age.tmp");
        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .map_err(|e| SecretError::WriteError(format!("cannot create temp file: {}", e)))?;

            // Set restrictive permissions BEFORE writing content (Unix only)
            #[cfg(unix)]
            {
                let permissions = fs::Permissions::from_mode(0o600);
                file.set_permissions(permissions).map_err(|e| {
                    SecretError::WriteError(format!("cannot set permissions: {}", e))
                })?;
            }

            file.write_all(contents)
                .map_err(|e| SecretError::WriteError(format!("cannot write file: {}", e)))?;
            file.sync_all()
                .map_err(|e| SecretError::WriteError(format!("cannot sync to disk: {}", e)))?;
        }

        fs::rename(&temp_path, path)
            .map_err(|e| SecretError::WriteError(format!("cannot rename temp file: {}", e)))
    }
}

fn map_decrypt_error(err: DecryptError) -> SecretError {
    match err {
        DecryptError::NoMatchingKeys
        | DecryptError::DecryptionFailed
        | DecryptError::KeyDecryptionFailed => {
            SecretError::AuthenticationRequired("wrong passphrase for encrypted store".into())
        }
        other => SecretError::CorruptStore(format!("cannot decrypt: {}", other)),
    }
}

impl SecretBackend for EncryptedFileBackend {
    fn name(&self) -> &str {
        "file"
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SecretError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let ciphertext = fs::read(&path)
            .map_err(|e| SecretError::ReadError(format!("cannot read encrypted file: {}", e)))?;
        if let Some(plaintext) = self.cached(key, &ciphertext) {
            return Ok(Some(plaintext));
        }
        let plaintext = self.decrypt(&ciphertext)?;
        self.remember(key, ciphertext, plaintext.clone());
        Ok(Some(plaintext))
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), SecretError> {
        let path = self.path_for(key);
        let ciphertext = self.encrypt(value, !path.exists())?;
        self.forget(key);
        self.write_atomic(&path, &ciphertext)?;
        self.remember(key, ciphertext, value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), SecretError> {
        self.forget(key);
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SecretError::WriteError(format!(
                "cannot delete encrypted file: {}",
                e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::passphrase::StaticPassphrase;
    use tempfile::TempDir;

    fn backend(dir: &TempDir, passphrase: &str) -> EncryptedFileBackend {
        EncryptedFileBackend::new(
            dir.path().join("secure"),
            Arc::new(StaticPassphrase::new(passphrase)),
        )
    }

    #[test]
    fn get_nonexistent_returns_none() {
        let temp = TempDir::new().expect("create temp dir");
        let store = backend(&temp, "pw");
        assert!(store.get("records").expect("get").is_none());
    }

    #[test]
    fn roundtrip_and_wrong_passphrase() {
        let temp = TempDir::new().expect("create temp dir");
        let store = backend(&temp, "correct horse");
        store.set("records", b"{\"tokens\":{}}").expect("set");

        let raw = fs::read(store.path_for("records")).expect("read raw");
        assert!(!raw.windows(6).any(|w| w == b"tokens"));

        assert_eq!(
            store.get("records").expect("get"),
            Some(b"{\"tokens\":{}}".to_vec())
        );

        let wrong = backend(&temp, "battery staple");
        assert!(matches!(
            wrong.get("records"),
            Err(SecretError::AuthenticationRequired(_))
        ));
    }

    /// Counts passphrase requests; each one stands for an scrypt run.
    struct Counting {
        inner: StaticPassphrase,
        calls: std::sync::atomic::AtomicUsize,
    }

    impl PassphraseProvider for Counting {
        fn passphrase(&self, new_store: bool) -> Result<secrecy::SecretString, SecretError> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            self.inner.passphrase(new_store)
        }
    }

    #[test]
    fn repeated_reads_skip_decryption() {
        let temp = TempDir::new().expect("create temp dir");
        let counting = Arc::new(Counting {
            inner: StaticPassphrase::new("pw"),
            calls: std::sync::atomic::AtomicUsize::new(0),
        });
        let store = EncryptedFileBackend::new(temp.path().join("secure"), counting.clone());
        let calls = || counting.calls.load(std::sync::atomic::Ordering::SeqCst);

        store.set("records", b"one").expect("set");
        assert_eq!(calls(), 1);
        assert_eq!(store.get("records").expect("get"), Some(b"one".to_vec()));
        assert_eq!(store.get("records").expect("get"), Some(b"one".to_vec()));
        assert_eq!(calls(), 1);

        // Another writer replaces the file: the stale plaintext is not served.
        backend(&temp, "pw").set("records", b"two").expect("set");
        assert_eq!(store.get("records").expect("get"), Some(b"two".to_vec()));
        assert_eq!(calls(), 2);

        store.delete("records").expect("delete");
        assert!(store.get("records").expect("get").is_none());
    }

    #[test]
    fn garbage_file_is_corrupt() {
        let temp = TempDir::new().expect("create temp dir");
        let store = backend(&temp, "pw");
        fs::create_dir_all(store.dir()).unwrap();
        fs::write(store.path_for("records"), b"not an age file").unwrap();
        assert!(matches!(
            store.get("records"),
            Err(SecretError::CorruptStore(_))
        ));
    }

    #[test]
    fn delete_nonexistent_ok() {
        let temp = TempDir::new().expect("create temp dir");
        let store = backend(&temp, "pw");
        store.delete("records").expect("delete nonexistent");
    }

    #[test]
    fn empty_passphrase_aborts_before_writing() {
        let temp = TempDir::new().expect("create temp dir");
        let store = backend(&temp, "");
        assert!(matches!(
            store.set("records", b"x"),
            Err(SecretError::Aborted(_))
        ));
        assert!(!store.path_for("records").exists());
    }

    #[cfg(unix)]
    #[test]
    fn permissions_0600_on_unix() {
        let temp = TempDir::new().expect("create temp dir");
        let store = backend(&temp, "pw");
        store.set("records", b"x").expect("set");

        let metadata = fs::metadata(store.path_for("records")).expect("metadata");
        let mode = metadata.permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "permissions should be 0600");
    }
}
