//! secrets::chunked
//!
//! Chunking adapter for backends with a per-entry size cap.
//!
//! # Layout
//!
//! A value `B` stored under `key` is split across `key_0`, `key_1`, ...:
//!
//! - `key_0` holds an 8-byte big-endian length of `B` followed by the first
//!   `max - 8` bytes of `B`
//! - every following entry holds the next `max` bytes
//!
//! No entry ever exceeds `max` bytes. Reads stop once the announced length
//! has been collected; a missing, empty, or oversized chunk is
//! [`SecretError::CorruptStore`].
//!
//! Writes delete trailing chunks left over from a previously larger value.

use super::traits::{SecretBackend, SecretError};

/// Size of the length prefix in the first chunk.
pub const LENGTH_PREFIX: usize = 8;

/// Wraps a size-capped backend and presents uncapped entries.
pub struct ChunkedBackend {
    inner: Box<dyn SecretBackend>,
    max: usize,
}

impl ChunkedBackend {
    /// Wrap `inner`, splitting values into entries of at most `max` bytes.
    ///
    /// # Errors
    ///
    /// Returns `SecretError::BackendUnavailable` if `max` cannot hold the
    /// length prefix plus at least one byte.
    pub fn new(inner: Box<dyn SecretBackend>, max: usize) -> Result<Self, SecretError> {
        if max <= LENGTH_PREFIX {
            return Err(SecretError::BackendUnavailable(format!(
                "entry limit {} is too small for chunking",
                max
            )));
        }
        Ok(Self { inner, max })
    }

    fn chunk_key(key: &str, index: usize) -> String {
        format!("{}_{}", key, index)
    }

    /// Split `value` into the entries written for it.
    fn split(&self, value: &[u8]) -> Vec<Vec<u8>> {
        let first_len = value.len().min(self.max - LENGTH_PREFIX);
        let mut first = Vec::with_capacity(LENGTH_PREFIX + first_len);
        first.extend_from_slice(&(value.len() as u64).to_be_bytes());
        first.extend_from_slice(&value[..first_len]);

        let mut chunks = vec![first];
        chunks.extend(value[first_len..].chunks(self.max).map(<[u8]>::to_vec));
        chunks
    }

    /// Delete `key_<from>`, `key_<from+1>`, ... until one is missing.
    fn delete_from(&self, key: &str, from: usize) -> Result<(), SecretError> {
        let mut index = from;
        loop {
            let chunk_key = Self::chunk_key(key, index);
            if self.inner.get(&chunk_key)?.is_none() {
                return Ok(());
            }
            self.inner.delete(&chunk_key)?;
            tracing::debug!(key = %chunk_key, "deleted stale chunk");
            index += 1;
        }
    }
}

impl SecretBackend for ChunkedBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SecretError> {
        let first = match self.inner.get(&Self::chunk_key(key, 0))? {
            Some(bytes) => bytes,
            None => return Ok(None),
        };

        if first.len() < LENGTH_PREFIX {
            return Err(SecretError::CorruptStore(format!(
                "first chunk of '{}' is shorter than its length prefix",
                key
            )));
        }
        let mut prefix = [0u8; LENGTH_PREFIX];
        prefix.copy_from_slice(&first[..LENGTH_PREFIX]);
        let total = usize::try_from(u64::from_be_bytes(prefix)).map_err(|_| {
            SecretError::CorruptStore(format!("length prefix of '{}' is out of range", key))
        })?;

        let mut body = first[LENGTH_PREFIX..].to_vec();
        let mut index = 1;
        while body.len() < total {
            let chunk_key = Self::chunk_key(key, index);
            let chunk = self.inner.get(&chunk_key)?.ok_or_else(|| {
                SecretError::CorruptStore(format!(
                    "missing chunk '{}' ({} of {} bytes read)",
                    chunk_key,
                    body.len(),
                    total
                ))
            })?;
            if chunk.is_empty() {
                return Err(SecretError::CorruptStore(format!(
                    "chunk '{}' is empty",
                    chunk_key
                )));
            }
            body.extend_from_slice(&chunk);
            index += 1;
        }

        if body.len() != total {
            return Err(SecretError::CorruptStore(format!(
                "'{}' holds {} bytes, length prefix says {}",
                key,
                body.len(),
                total
            )));
        }
        Ok(Some(body))
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), SecretError> {
        let chunks = self.split(value);
        for (index, chunk) in chunks.iter().enumerate() {
            self.inner.set(&Self::chunk_key(key, index), chunk)?;
        }
        tracing::debug!(key, chunks = chunks.len(), "wrote chunked entry");
        self.delete_from(key, chunks.len())
    }

    fn delete(&self, key: &str) -> Result<(), SecretError> {
        self.delete_from(key, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::memory::MemoryBackend;

    fn chunked(max: usize) -> (MemoryBackend, ChunkedBackend) {
        let raw = MemoryBackend::with_cap(max);
        let adapter = ChunkedBackend::new(Box::new(raw.clone()), max).unwrap();
        (raw, adapter)
    }

    #[test]
    fn rejects_tiny_limits() {
        assert!(ChunkedBackend::new(Box::new(MemoryBackend::new()), 8).is_err());
    }

    #[test]
    fn small_value_fits_first_chunk() {
        let (raw, store) = chunked(2000);
        store.set("rec", b"hello").unwrap();

        assert_eq!(raw.keys(), vec!["rec_0".to_string()]);
        let first = raw.get("rec_0").unwrap().unwrap();
        assert_eq!(&first[..8], &5u64.to_be_bytes());
        assert_eq!(&first[8..], b"hello");
        assert_eq!(store.get("rec").unwrap(), Some(b"hello".to_vec()));
    }

    #[test]
    fn empty_value() {
        let (raw, store) = chunked(2000);
        store.set("rec", b"").unwrap();
        assert_eq!(raw.get("rec_0").unwrap().unwrap().len(), 8);
        assert_eq!(store.get("rec").unwrap(), Some(Vec::new()));
    }

    #[test]
    fn exact_fit_does_not_spill() {
        let (raw, store) = chunked(16);
        store.set("rec", &[7u8; 8]).unwrap();
        assert_eq!(raw.keys(), vec!["rec_0".to_string()]);

        store.set("rec", &[7u8; 9]).unwrap();
        assert_eq!(raw.keys(), vec!["rec_0".to_string(), "rec_1".to_string()]);
        assert_eq!(raw.get("rec_1").unwrap().unwrap(), vec![7u8]);
    }

    #[test]
    fn missing_entry_is_none() {
        let (_raw, store) = chunked(2000);
        assert!(store.get("rec").unwrap().is_none());
    }

    #[test]
    fn shrinking_removes_stale_chunks() {
        let (raw, store) = chunked(100);
        store.set("rec", &[1u8; 450]).unwrap();
        assert_eq!(raw.keys().len(), 5);

        store.set("rec", &[2u8; 50]).unwrap();
        assert_eq!(raw.keys(), vec!["rec_0".to_string()]);
        assert_eq!(store.get("rec").unwrap(), Some(vec![2u8; 50]));
    }

    #[test]
    fn delete_removes_all_chunks() {
        let (raw, store) = chunked(100);
        store.set("rec", &[1u8; 450]).unwrap();
        store.delete("rec").unwrap();
        assert!(raw.keys().is_empty());
        store.delete("rec").unwrap();
    }

    #[test]
    fn missing_chunk_is_corrupt() {
        let (raw, store) = chunked(100);
        store.set("rec", &[1u8; 250]).unwrap();
        raw.delete("rec_1").unwrap();
        assert!(matches!(
            store.get("rec"),
            Err(SecretError::CorruptStore(_))
        ));
    }

    #[test]
    fn short_prefix_is_corrupt() {
        let (raw, store) = chunked(100);
        raw.set("rec_0", &[0u8; 3]).unwrap();
        assert!(matches!(
            store.get("rec"),
            Err(SecretError::CorruptStore(_))
        ));
    }

    #[test]
    fn overshoot_is_corrupt() {
        let (raw, store) = chunked(100);
        let mut first = 10u64.to_be_bytes().to_vec();
        first.extend_from_slice(&[1u8; 20]);
        raw.set("rec_0", &first).unwrap();
        assert!(matches!(
            store.get("rec"),
            Err(SecretError::CorruptStore(_))
        ));
    }

    #[test]
    fn empty_chunk_is_corrupt() {
        let (raw, store) = chunked(100);
        let mut first = 200u64.to_be_bytes().to_vec();
        first.extend_from_slice(&[1u8; 92]);
        raw.set("rec_0", &first).unwrap();
        raw.set("rec_1", &[]).unwrap();
        assert!(matches!(
            store.get("rec"),
            Err(SecretError::CorruptStore(_))
        ));
    }
}
