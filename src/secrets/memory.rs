//! secrets::memory
//!
//! In-process backend for tests.
//!
//! Clones share the same underlying map, so a test can hand one clone to a
//! [`SecureStore`](super::SecureStore) and inspect raw entries through
//! another.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use super::traits::{SecretBackend, SecretError};

/// Map-backed secret backend with an optional per-entry size cap.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    entries: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
    cap: Option<usize>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend that rejects entries larger than `cap` bytes.
    pub fn with_cap(cap: usize) -> Self {
        Self {
            entries: Arc::default(),
            cap: Some(cap),
        }
    }

    /// All keys currently stored, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.entries
            .lock()
            .map(|e| e.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, Vec<u8>>>, SecretError> {
        self.entries
            .lock()
            .map_err(|_| SecretError::BackendUnavailable("memory backend poisoned".into()))
    }
}

impl SecretBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SecretError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), SecretError> {
        if let Some(cap) = self.cap {
            if value.len() > cap {
                return Err(SecretError::WriteError(format!(
                    "entry '{}' is {} bytes, limit is {}",
                    key,
                    value.len(),
                    cap
                )));
            }
        }
        self.lock()?.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), SecretError> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn max_entry_size(&self) -> Option<usize> {
        self.cap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_entries() {
        let a = MemoryBackend::new();
        let b = a.clone();
        a.set("k", b"v").unwrap();
        assert_eq!(b.get("k").unwrap(), Some(b"v".to_vec()));
        assert_eq!(b.keys(), vec!["k".to_string()]);
    }

    #[test]
    fn cap_is_enforced() {
        let backend = MemoryBackend::with_cap(4);
        assert!(backend.set("k", b"1234").is_ok());
        assert!(backend.set("k", b"12345").is_err());
        assert_eq!(backend.max_entry_size(), Some(4));
    }

    #[test]
    fn delete_is_idempotent() {
        let backend = MemoryBackend::new();
        backend.delete("missing").unwrap();
        backend.set("k", b"v").unwrap();
        backend.delete("k").unwrap();
        assert!(backend.get("k").unwrap().is_none());
    }
}
