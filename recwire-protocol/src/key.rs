//! Record keys and their 20-byte digests.
//!
//! The digest is RIPEMD-160 over `set ‖ key_type ‖ key_bytes`. The server
//! recomputes it independently, so the byte layout here is part of the
//! protocol contract.

use crate::error::ProtocolError;
use crate::types::ParticleType;
use ripemd::{Digest, Ripemd160};
use std::fmt;

/// Size of a record digest in bytes.
pub const DIGEST_SIZE: usize = 20;

/// Computes the record digest for a set name and typed key bytes.
///
/// An empty set name is permitted; empty key bytes are not.
pub fn compute_digest(
    set: &[u8],
    key_type: u8,
    key: &[u8],
) -> Result<[u8; DIGEST_SIZE], ProtocolError> {
    if key.is_empty() {
        return Err(ProtocolError::DigestInputInvalid("key bytes are empty"));
    }

    let mut hasher = Ripemd160::new();
    hasher.update(set);
    hasher.update([key_type]);
    hasher.update(key);

    let mut digest = [0u8; DIGEST_SIZE];
    digest.copy_from_slice(&hasher.finalize());
    Ok(digest)
}

/// A user key value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyValue {
    Int(i64),
    Str(String),
    Blob(Vec<u8>),
}

impl KeyValue {
    pub fn particle_type(&self) -> ParticleType {
        match self {
            KeyValue::Int(_) => ParticleType::Integer,
            KeyValue::Str(_) => ParticleType::String,
            KeyValue::Blob(_) => ParticleType::Blob,
        }
    }

    /// Key payload as hashed and as sent in a key field (without the type byte).
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            KeyValue::Int(v) => v.to_be_bytes().to_vec(),
            KeyValue::Str(s) => s.as_bytes().to_vec(),
            KeyValue::Blob(b) => b.clone(),
        }
    }

    /// Payload of a key field: type byte followed by the key bytes.
    pub fn to_field_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(9);
        out.push(self.particle_type().code());
        out.extend_from_slice(&self.to_bytes());
        out
    }
}

impl From<i64> for KeyValue {
    fn from(v: i64) -> Self {
        KeyValue::Int(v)
    }
}

impl From<&str> for KeyValue {
    fn from(v: &str) -> Self {
        KeyValue::Str(v.to_string())
    }
}

impl From<String> for KeyValue {
    fn from(v: String) -> Self {
        KeyValue::Str(v)
    }
}

impl From<Vec<u8>> for KeyValue {
    fn from(v: Vec<u8>) -> Self {
        KeyValue::Blob(v)
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Int(v) => write!(f, "{}", v),
            KeyValue::Str(s) => write!(f, "{:?}", s),
            KeyValue::Blob(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

/// Addresses one record: namespace, set and digest, plus the user key when known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    pub namespace: String,
    pub set: String,
    pub value: Option<KeyValue>,
    pub digest: [u8; DIGEST_SIZE],
}

impl Key {
    /// Creates a key and computes its digest.
    pub fn new(
        namespace: impl Into<String>,
        set: impl Into<String>,
        value: impl Into<KeyValue>,
    ) -> Result<Self, ProtocolError> {
        let set = set.into();
        let value = value.into();
        let digest = compute_digest(
            set.as_bytes(),
            value.particle_type().code(),
            &value.to_bytes(),
        )?;
        Ok(Self {
            namespace: namespace.into(),
            set,
            value: Some(value),
            digest,
        })
    }

    /// Creates a key from a digest computed elsewhere.
    pub fn from_digest(
        namespace: impl Into<String>,
        set: impl Into<String>,
        digest: [u8; DIGEST_SIZE],
    ) -> Self {
        Self {
            namespace: namespace.into(),
            set: set.into(),
            value: None,
            digest,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest_hex(set: &str, value: KeyValue) -> String {
        let digest = compute_digest(
            set.as_bytes(),
            value.particle_type().code(),
            &value.to_bytes(),
        )
        .unwrap();
        hex::encode(digest)
    }

    #[test]
    fn test_regression_vector() {
        assert_eq!(
            digest_hex("demo", KeyValue::Int(12345)),
            "8d60730e4a37c88b573022bdfe2e94497669c6b1"
        );
    }

    #[test]
    fn test_known_vectors() {
        assert_eq!(
            digest_hex("", KeyValue::Int(1)),
            "a443f05d05d962202b59abb402afae1737dbf66a"
        );
        assert_eq!(
            digest_hex("test", KeyValue::from("key1")),
            "1c4acea7d4566aef2bdf4057a5d86f8d3ac9f4de"
        );
        assert_eq!(
            digest_hex("demo", KeyValue::Blob(vec![1, 2, 3])),
            "ff31c926fbef445648ce63ca72a698a5473425c1"
        );
        assert_eq!(
            digest_hex("demo", KeyValue::Int(-1)),
            "e9d49a24c3debdc5a6d551d3e7087999a263bb97"
        );
    }

    #[test]
    fn test_deterministic() {
        let a = Key::new("test", "demo", 12345i64).unwrap();
        let b = Key::new("other-ns", "demo", 12345i64).unwrap();
        // Namespace does not participate in the digest.
        assert_eq!(a.digest, b.digest);
        assert_eq!(a.digest, Key::new("test", "demo", 12345i64).unwrap().digest);
    }

    #[test]
    fn test_sensitivity() {
        let base = compute_digest(b"demo", 1, &12345i64.to_be_bytes()).unwrap();
        assert_ne!(base, compute_digest(b"demp", 1, &12345i64.to_be_bytes()).unwrap());
        assert_ne!(base, compute_digest(b"demo", 4, &12345i64.to_be_bytes()).unwrap());
        assert_ne!(base, compute_digest(b"demo", 1, &12346i64.to_be_bytes()).unwrap());
    }

    #[test]
    fn test_empty_key_rejected() {
        let err = compute_digest(b"demo", 3, b"").unwrap_err();
        assert!(matches!(err, ProtocolError::DigestInputInvalid(_)));
        assert!(Key::new("test", "demo", "").is_err());
    }

    #[test]
    fn test_empty_set_permitted() {
        assert!(compute_digest(b"", 3, b"k").is_ok());
    }

    #[test]
    fn test_key_field_bytes() {
        assert_eq!(KeyValue::Int(1).to_field_bytes(), vec![1, 0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(KeyValue::from("ab").to_field_bytes(), vec![3, b'a', b'b']);
    }

    #[test]
    fn test_from_digest() {
        let computed = Key::new("test", "demo", 12345i64).unwrap();
        let key = Key::from_digest("test", "demo", computed.digest);
        assert_eq!(key.value, None);
        assert_eq!(key.digest, computed.digest);
        assert_ne!(key, computed);
    }
}
