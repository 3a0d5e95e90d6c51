//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::time::Duration;

use grant_cache::{CacheConfig, GrantCache, GrantResponse};

/// Resource id used by the default fixture grants.
pub const RESOURCE: &str = "fixture-channel";

/// Credential used by the default fixture grants.
pub const CREDENTIAL: &str = "fixture-auth-key";

/// A cache plus a fixed (resource, credential) pair.
pub struct TestFixture {
    pub cache: GrantCache<GrantResponse>,
    pub resource: String,
    pub credential: String,
}

impl TestFixture {
    /// Create a fixture with the default one-hour sweep period.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Create a fixture with a custom sweep period.
    pub fn with_sweep_period(period: Duration) -> Self {
        Self::with_config(CacheConfig::default().with_sweep_period(period))
    }

    /// Create a fixture from a full config.
    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            cache: GrantCache::new(config).expect("fixture cache must start inside a runtime"),
            resource: RESOURCE.to_string(),
            credential: CREDENTIAL.to_string(),
        }
    }

    /// Read-only grant for the fixture pair.
    pub fn read_grant(&self, ttl_minutes: i64) -> GrantResponse {
        GrantResponse::read_only(&self.resource, &self.credential).with_ttl(ttl_minutes)
    }

    /// Write-only grant for the fixture pair.
    pub fn write_grant(&self, ttl_minutes: i64) -> GrantResponse {
        GrantResponse::write_only(&self.resource, &self.credential).with_ttl(ttl_minutes)
    }

    /// Read/write grant for the fixture pair.
    pub fn read_write_grant(&self, ttl_minutes: i64) -> GrantResponse {
        GrantResponse::read_write(&self.resource, &self.credential).with_ttl(ttl_minutes)
    }

    /// Register a grant for the fixture pair.
    pub fn register(&self, grant: &GrantResponse) {
        self.cache
            .register(&self.resource, &self.credential, grant)
            .expect("fixture pair is non-empty");
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Distinct (resource, credential) pairs for multi-key tests.
pub fn distinct_pairs(count: usize) -> Vec<(String, String)> {
    (0..count)
        .map(|i| (format!("channel-{i}"), format!("auth-{i}")))
        .collect()
}
