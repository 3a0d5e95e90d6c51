//! Cache key derivation.
//!
//! A [`CacheKey`] is a BLAKE3 digest over a domain tag and the
//! length-prefixed resource id and credential. Length prefixes keep
//! `("ab", "c")` and `("a", "bc")` apart.

use std::fmt;

use crate::error::{CacheError, Result};

/// Domain separation tag for key derivation.
pub const KEY_DOMAIN: &[u8] = b"grant-cache-key-v0:";

/// Opaque 32-byte key indexing both cache stores.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey([u8; 32]);

impl CacheKey {
    /// Derive the key for a (resource, credential) pair.
    ///
    /// Both fields must be non-empty.
    pub fn derive(resource_id: &str, credential: &str) -> Result<Self> {
        if resource_id.is_empty() {
            return Err(CacheError::InvalidArgument(
                "resource id must not be empty".into(),
            ));
        }
        if credential.is_empty() {
            return Err(CacheError::InvalidArgument(
                "credential must not be empty".into(),
            ));
        }

        let mut hasher = blake3::Hasher::new();
        hasher.update(KEY_DOMAIN);
        hasher.update(&(resource_id.len() as u64).to_le_bytes());
        hasher.update(resource_id.as_bytes());
        hasher.update(&(credential.len() as u64).to_le_bytes());
        hasher.update(credential.as_bytes());
        Ok(Self(*hasher.finalize().as_bytes()))
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CacheKey({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}
