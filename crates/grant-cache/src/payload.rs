//! Payload store: compressed grant responses.
//!
//! Grants are serialized to JSON and gzip-compressed before storage. Kept
//! apart from the [`RegistrationStore`](crate::registration::RegistrationStore)
//! so permission checks never pay for decompression.

use std::io::{Read, Write};

use bytes::Bytes;
use dashmap::DashMap;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{CacheError, Result};
use crate::grant::Grant;
use crate::key::CacheKey;

/// Gzip-compress a UTF-8 string.
pub fn compress(text: &str) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes())?;
    encoder.finish()
}

/// Decompress gzip bytes back into a UTF-8 string.
pub fn decompress(bytes: &[u8]) -> std::io::Result<String> {
    let mut decoder = GzDecoder::new(bytes);
    let mut text = String::new();
    decoder.read_to_string(&mut text)?;
    Ok(text)
}

/// Serialize and compress a grant.
pub fn encode_grant<G: Grant>(grant: &G) -> Result<Bytes> {
    let json = serde_json::to_string(grant).map_err(|e| CacheError::Encoding(e.to_string()))?;
    let compressed = compress(&json).map_err(|e| CacheError::Encoding(e.to_string()))?;
    Ok(Bytes::from(compressed))
}

/// Decompress and deserialize a grant stored under `key`.
pub fn decode_grant<G: Grant>(key: CacheKey, bytes: &[u8]) -> Result<G> {
    let json = decompress(bytes).map_err(|e| CacheError::Integrity {
        key,
        reason: format!("decompression failed: {e}"),
    })?;
    serde_json::from_str(&json).map_err(|e| CacheError::Integrity {
        key,
        reason: format!("deserialization failed: {e}"),
    })
}

/// Concurrent map from key to compressed grant bytes.
#[derive(Debug, Default)]
pub struct PayloadStore {
    entries: DashMap<CacheKey, Bytes>,
}

impl PayloadStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode `grant` and store it under `key`, replacing any prior payload.
    ///
    /// Nothing is stored if encoding fails.
    pub fn register<G: Grant>(&self, key: CacheKey, grant: &G) -> Result<()> {
        let bytes = encode_grant(grant)?;
        self.insert_encoded(key, bytes);
        Ok(())
    }

    /// Load and decode the grant stored under `key`.
    pub fn load<G: Grant>(&self, key: &CacheKey) -> Result<Option<G>> {
        // Clone the cheap Bytes handle so decoding happens outside the shard lock.
        let bytes = match self.entries.get(key) {
            Some(entry) => entry.value().clone(),
            None => return Ok(None),
        };
        decode_grant(*key, &bytes).map(Some)
    }

    /// Store bytes already produced by [`encode_grant`].
    pub fn insert_encoded(&self, key: CacheKey, bytes: Bytes) {
        self.entries.insert(key, bytes);
    }

    pub fn unregister(&self, key: &CacheKey) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}
