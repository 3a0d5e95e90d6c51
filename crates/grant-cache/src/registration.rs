//! Registration store: per-key permission expiry metadata.
//!
//! This is the hot path. Every access decision reads it, so it holds only
//! two timestamps per key and never touches the compressed payload.

use dashmap::DashMap;

use crate::grant::{AccessType, Grant};
use crate::key::CacheKey;

const MILLIS_PER_MINUTE: i64 = 60_000;

/// Expiry metadata for one (resource, credential) pair.
///
/// Timestamps are Unix milliseconds. `None` means the access type was
/// never granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessRegistration {
    /// When read access expires.
    pub read_expires: Option<i64>,

    /// When write access expires.
    pub write_expires: Option<i64>,
}

impl AccessRegistration {
    /// Compute expiries for a grant registered at `now`.
    pub fn from_grant<G: Grant>(grant: &G, now: i64) -> Self {
        let expires = now.saturating_add(grant.ttl_minutes().saturating_mul(MILLIS_PER_MINUTE));
        Self {
            read_expires: grant.read_granted().then_some(expires),
            write_expires: grant.write_granted().then_some(expires),
        }
    }

    /// Expiry for the given access type.
    pub fn expires(&self, access: AccessType) -> Option<i64> {
        match access {
            AccessType::Read => self.read_expires,
            AccessType::Write => self.write_expires,
        }
    }

    /// Whether `access` is currently valid. Expiry is exclusive.
    pub fn is_granted(&self, access: AccessType, now: i64) -> bool {
        self.expires(access).is_some_and(|t| t > now)
    }

    /// True when neither read nor write access is still valid.
    pub fn is_fully_expired(&self, now: i64) -> bool {
        !self.is_granted(AccessType::Read, now) && !self.is_granted(AccessType::Write, now)
    }

    /// The later of the two expiries, if any access was granted.
    pub fn latest_expiry(&self) -> Option<i64> {
        match (self.read_expires, self.write_expires) {
            (Some(r), Some(w)) => Some(r.max(w)),
            (r, w) => r.or(w),
        }
    }
}

/// Concurrent map from key to [`AccessRegistration`].
///
/// Backed by a sharded map: readers never block each other and writers
/// only contend within a shard.
#[derive(Debug, Default)]
pub struct RegistrationStore {
    entries: DashMap<CacheKey, AccessRegistration>,
}

impl RegistrationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the registration for `key`.
    pub fn register(&self, key: CacheKey, registration: AccessRegistration) {
        self.entries.insert(key, registration);
    }

    /// Get a copy of the registration for `key`.
    pub fn get(&self, key: &CacheKey) -> Option<AccessRegistration> {
        self.entries.get(key).map(|entry| *entry)
    }

    /// Check whether `access` is granted for `key` at `now`.
    pub fn granted(&self, key: &CacheKey, access: AccessType, now: i64) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| entry.is_granted(access, now))
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert or overwrite the registration, running `with_lock` first
    /// while the key's shard is write-locked.
    ///
    /// `with_lock` must not touch this store.
    pub fn register_with(
        &self,
        key: CacheKey,
        registration: AccessRegistration,
        with_lock: impl FnOnce(),
    ) {
        let entry = self.entries.entry(key);
        with_lock();
        entry.insert(registration);
    }

    /// Remove the registration. Returns whether an entry was present.
    pub fn unregister(&self, key: &CacheKey) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Remove the registration, running `on_remove` while the key's shard
    /// is write-locked. `on_remove` is not called if the key is absent.
    pub fn unregister_with(&self, key: &CacheKey, on_remove: impl FnOnce()) -> bool {
        self.entries
            .remove_if(key, |_, _| {
                on_remove();
                true
            })
            .is_some()
    }

    /// Remove `key` only if it is fully expired at `now`.
    ///
    /// The check and removal happen under the shard lock, so a concurrent
    /// re-registration is never purged.
    pub fn remove_if_expired(&self, key: &CacheKey, now: i64) -> bool {
        self.remove_if_expired_with(key, now, || {})
    }

    /// Like [`remove_if_expired`](Self::remove_if_expired), running
    /// `on_remove` under the shard lock when the entry is removed.
    pub fn remove_if_expired_with(&self, key: &CacheKey, now: i64, on_remove: impl FnOnce()) -> bool {
        self.entries
            .remove_if(key, |_, registration| {
                if !registration.is_fully_expired(now) {
                    return false;
                }
                on_remove();
                true
            })
            .is_some()
    }

    /// Copy the current key set.
    pub fn snapshot_keys(&self) -> Vec<CacheKey> {
        self.entries.iter().map(|entry| *entry.key()).collect()
    }

    /// Entry whose latest expiry is soonest. Never-granted entries sort first.
    pub fn soonest_expiring(&self) -> Option<(CacheKey, AccessRegistration)> {
        self.entries
            .iter()
            .min_by_key(|entry| entry.value().latest_expiry().unwrap_or(i64::MIN))
            .map(|entry| (*entry.key(), *entry.value()))
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

/// Get current time in milliseconds.
pub fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}
