//! Error types for the grant cache.

use thiserror::Error;

use crate::key::CacheKey;

/// Errors that can occur during cache operations.
///
/// Expiry is never an error: an expired or unknown grant shows up as
/// `false` from `granted` and `None` from `cached_registration`.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Caller passed an empty resource id or credential, or an unusable config.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Stored payload bytes failed to decompress or deserialize.
    #[error("cache integrity error for key {key}: {reason}")]
    Integrity { key: CacheKey, reason: String },

    /// Grant could not be serialized or compressed for storage.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// No Tokio runtime was available to host the sweeper.
    #[error("runtime error: {0}")]
    Runtime(String),
}

impl CacheError {
    /// True if this error signals a corrupt cached payload.
    pub fn is_integrity(&self) -> bool {
        matches!(self, CacheError::Integrity { .. })
    }
}

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
