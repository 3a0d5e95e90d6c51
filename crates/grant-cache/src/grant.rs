//! Grant responses and access types.
//!
//! A grant is the result of a remote authorization decision. The cache
//! only needs to know which access types were approved and for how long;
//! everything else in the response is carried along opaquely.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Kind of access a grant can approve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessType {
    Read,
    Write,
}

/// A grant the cache can register.
///
/// Implementors must be serializable so the full response can be stored
/// and reconstructed without another round-trip to the authorization
/// service.
pub trait Grant: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Whether read access was approved.
    fn read_granted(&self) -> bool;

    /// Whether write access was approved.
    fn write_granted(&self) -> bool;

    /// Minutes from now until the grant expires. Negative means already expired.
    fn ttl_minutes(&self) -> i64;

    /// Whether the given access type was approved.
    fn is_granted(&self, access: AccessType) -> bool {
        match access {
            AccessType::Read => self.read_granted(),
            AccessType::Write => self.write_granted(),
        }
    }
}

/// Grant response returned by the authorization service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantResponse {
    /// Scope the grant was issued at (e.g. "channel", "user").
    pub level: String,

    /// Account key the grant belongs to.
    pub subscribe_key: String,

    /// The resource the grant applies to.
    pub resource: String,

    /// Credentials covered by the grant.
    pub auth_keys: Vec<String>,

    /// Read access approved.
    pub read: bool,

    /// Write access approved.
    pub write: bool,

    /// Management access approved. Carried but not cached as a permission.
    pub manage: bool,

    /// Lifetime of the grant in minutes.
    pub ttl_minutes: i64,
}

impl GrantResponse {
    /// Default grant lifetime used by the authorization service.
    pub const DEFAULT_TTL_MINUTES: i64 = 1440;

    /// Create a grant with no access approved.
    pub fn new(resource: impl Into<String>, auth_key: impl Into<String>) -> Self {
        Self {
            level: "channel".to_string(),
            subscribe_key: String::new(),
            resource: resource.into(),
            auth_keys: vec![auth_key.into()],
            read: false,
            write: false,
            manage: false,
            ttl_minutes: Self::DEFAULT_TTL_MINUTES,
        }
    }

    /// Create a read-only grant.
    pub fn read_only(resource: impl Into<String>, auth_key: impl Into<String>) -> Self {
        Self::new(resource, auth_key).with_read(true)
    }

    /// Create a write-only grant.
    pub fn write_only(resource: impl Into<String>, auth_key: impl Into<String>) -> Self {
        Self::new(resource, auth_key).with_write(true)
    }

    /// Create a grant with both read and write access.
    pub fn read_write(resource: impl Into<String>, auth_key: impl Into<String>) -> Self {
        Self::new(resource, auth_key).with_read(true).with_write(true)
    }

    pub fn with_read(mut self, read: bool) -> Self {
        self.read = read;
        self
    }

    pub fn with_write(mut self, write: bool) -> Self {
        self.write = write;
        self
    }

    pub fn with_manage(mut self, manage: bool) -> Self {
        self.manage = manage;
        self
    }

    /// Set the lifetime in minutes.
    pub fn with_ttl(mut self, ttl_minutes: i64) -> Self {
        self.ttl_minutes = ttl_minutes;
        self
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_subscribe_key(mut self, subscribe_key: impl Into<String>) -> Self {
        self.subscribe_key = subscribe_key.into();
        self
    }
}

impl Grant for GrantResponse {
    fn read_granted(&self) -> bool {
        self.read
    }

    fn write_granted(&self) -> bool {
        self.write
    }

    fn ttl_minutes(&self) -> i64 {
        self.ttl_minutes
    }
}
