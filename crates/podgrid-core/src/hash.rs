//! Content hashing for configuration change detection.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Truncated SHA-256 of a value's JSON encoding.
///
/// Struct fields serialize in declaration order and every map in the service
/// tree is a `BTreeMap`, so equal values always hash equally.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpecHash(String);

impl SpecHash {
    pub fn of<T: Serialize>(value: &T) -> Self {
        // Only maps with non-string keys fail to encode; none exist here.
        let bytes = serde_json::to_vec(value).unwrap_or_default();
        let digest = Sha256::digest(&bytes);
        Self(format!("sha256:{}", hex::encode(&digest[..16])))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SpecHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
