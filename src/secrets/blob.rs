//! secrets::blob
//!
//! The single serialized document holding every stored record.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::traits::SecretError;
use crate::core::records::{AccessToken, ClientRegistration, RoleCredentials};

/// All three record families, serialized together as JSON.
///
/// Missing maps deserialize as empty, so `{}` and an empty payload are both
/// an empty store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageBlob {
    /// Client registrations keyed by SSO region
    pub registrations: BTreeMap<String, ClientRegistration>,
    /// Access tokens keyed by `region|start_url`
    pub tokens: BTreeMap<String, AccessToken>,
    /// Role credentials keyed by canonical ARN
    pub role_credentials: BTreeMap<String, RoleCredentials>,
}

impl StorageBlob {
    /// Decode a stored payload.
    ///
    /// # Errors
    ///
    /// Returns `SecretError::CorruptStore` if the bytes are not a valid blob.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SecretError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(bytes)
            .map_err(|e| SecretError::CorruptStore(format!("cannot decode records: {}", e)))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, SecretError> {
        serde_json::to_vec(self)
            .map_err(|e| SecretError::WriteError(format!("cannot encode records: {}", e)))
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty() && self.tokens.is_empty() && self.role_credentials.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_inputs_decode_to_empty_maps() {
        for input in [&b""[..], b"{}", b"  \n"] {
            let blob = StorageBlob::from_bytes(input).unwrap();
            assert!(blob.is_empty());
        }
    }

    #[test]
    fn partial_document_fills_defaults() {
        let blob = StorageBlob::from_bytes(br#"{"tokens":{}}"#).unwrap();
        assert!(blob.registrations.is_empty());
        assert!(blob.role_credentials.is_empty());
    }

    #[test]
    fn garbage_is_corrupt() {
        assert!(matches!(
            StorageBlob::from_bytes(b"\x00\x01nope"),
            Err(SecretError::CorruptStore(_))
        ));
    }

    #[test]
    fn serialized_shape_has_three_maps() {
        let bytes = StorageBlob::default().to_bytes().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(value["registrations"].is_object());
        assert!(value["tokens"].is_object());
        assert!(value["role_credentials"].is_object());
    }
}
