//! The grant cache: public API over the registration and payload stores.

use std::marker::PhantomData;
use std::sync::Arc;

use bytes::Bytes;

use crate::config::CacheConfig;
use crate::error::Result;
use crate::grant::{AccessType, Grant};
use crate::key::CacheKey;
use crate::payload::{encode_grant, PayloadStore};
use crate::registration::{now_millis, AccessRegistration, RegistrationStore};
use crate::sweeper::{sweep, SweepReport, Sweeper};

/// Both stores, shared between the cache and its sweeper task.
#[derive(Debug, Default)]
struct Stores {
    registrations: RegistrationStore,
    payloads: PayloadStore,
}

// Lock order is always registration shard, then payload shard. Every
// mutation of a key touches the payload while holding the registration
// shard lock, so a key never ends up with live metadata and no payload.
impl Stores {
    fn insert(&self, key: CacheKey, registration: AccessRegistration, payload: Bytes) {
        self.registrations.register_with(key, registration, || {
            self.payloads.insert_encoded(key, payload);
        });
    }

    fn remove(&self, key: &CacheKey) -> bool {
        self.registrations.unregister_with(key, || {
            self.payloads.unregister(key);
        })
    }

    fn purge_expired(&self, now: i64) -> SweepReport {
        sweep(&self.registrations, &self.payloads, now)
    }
}

/// Time-bounded cache of access grants.
///
/// Keys are derived from a resource id and a credential. Metadata and
/// payload live in separate concurrent maps. Registrations are
/// last-write-wins per key.
///
/// Both maps are updated under the key's registration shard lock, so a
/// reader that finds metadata also finds the matching payload, except
/// for the instant between the two reads in
/// [`cached_registration`](Self::cached_registration).
///
/// A background [`Sweeper`] purges fully-expired entries every
/// [`CacheConfig::sweep_period`]. It stops on [`GrantCache::shutdown`] or
/// when the cache is dropped.
#[derive(Debug)]
pub struct GrantCache<G: Grant> {
    stores: Arc<Stores>,
    config: CacheConfig,
    sweeper: Sweeper,
    _grant: PhantomData<fn() -> G>,
}

impl<G: Grant> GrantCache<G> {
    /// Create a cache and start its sweeper.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: CacheConfig) -> Result<Self> {
        config.validate()?;

        let stores = Arc::new(Stores::default());
        let sweeper_stores = Arc::clone(&stores);
        let sweeper = Sweeper::spawn(config.sweep_period, move || {
            sweeper_stores.purge_expired(now_millis());
        })?;

        Ok(Self {
            stores,
            config,
            sweeper,
            _grant: PhantomData,
        })
    }

    /// Create a cache with the default configuration.
    pub fn with_defaults() -> Result<Self> {
        Self::new(CacheConfig::default())
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Grant Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Cache a grant for (resource, credential), replacing any earlier one.
    pub fn register(&self, resource_id: &str, credential: &str, grant: &G) -> Result<()> {
        self.register_at(resource_id, credential, grant, now_millis())
    }

    /// Cache a grant as if registered at `now` (Unix ms).
    pub fn register_at(
        &self,
        resource_id: &str,
        credential: &str,
        grant: &G,
        now: i64,
    ) -> Result<()> {
        let key = CacheKey::derive(resource_id, credential)?;
        // Encode before taking any lock; nothing is stored if this fails.
        let payload = encode_grant(grant)?;

        if let Some(max) = self.config.max_entries {
            if !self.stores.registrations.contains(&key) {
                self.make_room(max, now);
            }
        }

        self.stores
            .insert(key, AccessRegistration::from_grant(grant, now), payload);

        tracing::debug!(%key, ttl_minutes = grant.ttl_minutes(), "registered grant");
        Ok(())
    }

    /// Whether `access` is currently granted for (resource, credential).
    pub fn granted(&self, resource_id: &str, credential: &str, access: AccessType) -> Result<bool> {
        self.granted_at(resource_id, credential, access, now_millis())
    }

    /// Whether `access` is granted at time `now` (Unix ms).
    pub fn granted_at(
        &self,
        resource_id: &str,
        credential: &str,
        access: AccessType,
        now: i64,
    ) -> Result<bool> {
        let key = CacheKey::derive(resource_id, credential)?;
        Ok(self.stores.registrations.granted(&key, access, now))
    }

    /// The cached grant response for (resource, credential), if any.
    ///
    /// Returns `Err(CacheError::Integrity)` if the stored payload is
    /// corrupt; callers should re-authorize and unregister the key.
    pub fn cached_registration(&self, resource_id: &str, credential: &str) -> Result<Option<G>> {
        let key = CacheKey::derive(resource_id, credential)?;
        if !self.stores.registrations.contains(&key) {
            return Ok(None);
        }

        let loaded = self.stores.payloads.load(&key);
        if let Err(ref e) = loaded {
            tracing::warn!(%key, "cached grant payload is unreadable: {}", e);
        }
        loaded
    }

    /// The expiry metadata for (resource, credential), if any.
    pub fn registration(
        &self,
        resource_id: &str,
        credential: &str,
    ) -> Result<Option<AccessRegistration>> {
        let key = CacheKey::derive(resource_id, credential)?;
        Ok(self.stores.registrations.get(&key))
    }

    /// Drop the cached grant for (resource, credential). Idempotent.
    pub fn unregister(&self, resource_id: &str, credential: &str) -> Result<()> {
        let key = CacheKey::derive(resource_id, credential)?;
        if self.stores.remove(&key) {
            tracing::debug!(%key, "unregistered grant");
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Maintenance
    // ─────────────────────────────────────────────────────────────────────────

    /// Run a sweep immediately, independent of the background schedule.
    pub fn purge_expired(&self) -> SweepReport {
        self.stores.purge_expired(now_millis())
    }

    /// Run a sweep as of time `now` (Unix ms).
    pub fn purge_expired_at(&self, now: i64) -> SweepReport {
        self.stores.purge_expired(now)
    }

    /// Number of cached keys, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.stores.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.registrations.is_empty()
    }

    /// Drop every cached grant present when the call starts.
    ///
    /// Grants registered concurrently may survive.
    pub fn clear(&self) {
        for key in self.stores.registrations.snapshot_keys() {
            self.stores.remove(&key);
        }
    }

    /// Whether the background sweeper is still running.
    pub fn is_sweeping(&self) -> bool {
        self.sweeper.is_running()
    }

    /// Stop the background sweeper and wait for it to exit.
    ///
    /// The cache stays usable; expired entries are then only removed by
    /// [`purge_expired`](Self::purge_expired) or [`unregister`](Self::unregister).
    pub async fn shutdown(&self) {
        self.sweeper.shutdown().await;
    }

    /// Free a slot for one more key.
    ///
    /// Looks at the soonest-expiring entry: if it is already fully expired
    /// a full purge runs, otherwise that entry is evicted. The bound is
    /// approximate; concurrent registrations of new keys can each pass the
    /// check and briefly overshoot `max`.
    fn make_room(&self, max: usize, now: i64) {
        let registrations = &self.stores.registrations;
        while registrations.len() >= max {
            let Some((victim, registration)) = registrations.soonest_expiring() else {
                break;
            };
            if registration.is_fully_expired(now) {
                let report = self.stores.purge_expired(now);
                if report.purged > 0 {
                    continue;
                }
            }
            self.stores.remove(&victim);
            tracing::debug!(key = %victim, max, "evicted grant to stay within bound");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;
    use crate::grant::GrantResponse;

    const MINUTE: i64 = 60_000;

    fn cache() -> GrantCache<GrantResponse> {
        GrantCache::with_defaults().unwrap()
    }

    #[tokio::test]
    async fn test_unknown_key_is_not_granted() {
        let cache = cache();

        assert!(!cache.granted("ch", "auth", AccessType::Read).unwrap());
        assert!(!cache.granted("ch", "auth", AccessType::Write).unwrap());
        assert!(cache.cached_registration("ch", "auth").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_only_grant() {
        let cache = cache();
        let grant = GrantResponse::read_only("ch", "auth").with_ttl(10);

        cache.register("ch", "auth", &grant).unwrap();

        assert!(cache.granted("ch", "auth", AccessType::Read).unwrap());
        assert!(!cache.granted("ch", "auth", AccessType::Write).unwrap());
        assert_eq!(cache.cached_registration("ch", "auth").unwrap(), Some(grant));
    }

    #[tokio::test]
    async fn test_expiry_without_sweep() {
        let cache = cache();
        let grant = GrantResponse::read_write("ch", "auth").with_ttl(5);

        cache.register_at("ch", "auth", &grant, 0).unwrap();

        assert!(cache.granted_at("ch", "auth", AccessType::Read, 5 * MINUTE - 1).unwrap());
        assert!(!cache.granted_at("ch", "auth", AccessType::Read, 5 * MINUTE).unwrap());
        assert!(!cache.granted_at("ch", "auth", AccessType::Write, 6 * MINUTE).unwrap());

        // Still cached until a sweep runs.
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_unregister_is_immediate() {
        let cache = cache();
        let grant = GrantResponse::read_write("ch", "auth").with_ttl(60);
        cache.register("ch", "auth", &grant).unwrap();

        cache.unregister("ch", "auth").unwrap();

        assert!(!cache.granted("ch", "auth", AccessType::Read).unwrap());
        assert!(!cache.granted("ch", "auth", AccessType::Write).unwrap());
        assert!(cache.cached_registration("ch", "auth").unwrap().is_none());

        // Idempotent.
        cache.unregister("ch", "auth").unwrap();
    }

    #[tokio::test]
    async fn test_reregister_replaces() {
        let cache = cache();
        cache
            .register("ch", "auth", &GrantResponse::read_only("ch", "auth"))
            .unwrap();
        let second = GrantResponse::write_only("ch", "auth").with_ttl(3);
        cache.register("ch", "auth", &second).unwrap();

        assert!(!cache.granted("ch", "auth", AccessType::Read).unwrap());
        assert!(cache.granted("ch", "auth", AccessType::Write).unwrap());
        assert_eq!(cache.cached_registration("ch", "auth").unwrap(), Some(second));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_arguments_rejected() {
        let cache = cache();
        let grant = GrantResponse::read_only("ch", "auth");

        assert!(matches!(
            cache.register("", "auth", &grant),
            Err(CacheError::InvalidArgument(_))
        ));
        assert!(matches!(
            cache.granted("ch", "", AccessType::Read),
            Err(CacheError::InvalidArgument(_))
        ));
        assert!(cache.cached_registration("", "").is_err());
        assert!(cache.unregister("ch", "").is_err());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_payload_is_integrity_error() {
        let cache = cache();
        cache
            .register("ch", "auth", &GrantResponse::read_only("ch", "auth"))
            .unwrap();

        let key = CacheKey::derive("ch", "auth").unwrap();
        cache
            .stores
            .payloads
            .insert_encoded(key, Bytes::from_static(b"\x1f\x8b garbage"));

        let err = cache.cached_registration("ch", "auth").unwrap_err();
        assert!(err.is_integrity());

        // Permission checks never read the payload.
        assert!(cache.granted("ch", "auth", AccessType::Read).unwrap());
    }

    #[tokio::test]
    async fn test_purge_expired_removes_both_stores() {
        let cache = cache();
        let expired = GrantResponse::read_write("old", "auth").with_ttl(-1);
        let live = GrantResponse::read_only("new", "auth").with_ttl(60);

        cache.register("old", "auth", &expired).unwrap();
        cache.register("new", "auth", &live).unwrap();

        let report = cache.purge_expired();
        assert_eq!(report.purged, 1);

        let old_key = CacheKey::derive("old", "auth").unwrap();
        assert!(!cache.stores.registrations.contains(&old_key));
        assert!(!cache.stores.payloads.contains(&old_key));
        assert!(cache.cached_registration("old", "auth").unwrap().is_none());
        assert!(cache.cached_registration("new", "auth").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_max_entries_evicts_soonest_expiring() {
        let config = CacheConfig::default().with_max_entries(2);
        let cache: GrantCache<GrantResponse> = GrantCache::new(config).unwrap();

        cache
            .register_at("a", "auth", &GrantResponse::read_only("a", "auth").with_ttl(5), 0)
            .unwrap();
        cache
            .register_at("b", "auth", &GrantResponse::read_only("b", "auth").with_ttl(50), 0)
            .unwrap();
        cache
            .register_at("c", "auth", &GrantResponse::read_only("c", "auth").with_ttl(20), 0)
            .unwrap();

        assert_eq!(cache.len(), 2);
        assert!(cache.registration("a", "auth").unwrap().is_none());
        assert!(cache.registration("b", "auth").unwrap().is_some());
        assert!(cache.registration("c", "auth").unwrap().is_some());

        // Re-registering an existing key never evicts.
        cache
            .register_at("b", "auth", &GrantResponse::read_only("b", "auth"), 0)
            .unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_max_entries_prefers_purging_expired() {
        let config = CacheConfig::default().with_max_entries(2);
        let cache: GrantCache<GrantResponse> = GrantCache::new(config).unwrap();

        cache
            .register_at("dead", "auth", &GrantResponse::read_only("dead", "auth").with_ttl(1), 0)
            .unwrap();
        cache
            .register_at("live", "auth", &GrantResponse::read_only("live", "auth").with_ttl(60), 0)
            .unwrap();
        cache
            .register_at("next", "auth", &GrantResponse::read_only("next", "auth"), 10 * MINUTE)
            .unwrap();

        assert!(cache.registration("dead", "auth").unwrap().is_none());
        assert!(cache.registration("live", "auth").unwrap().is_some());
        assert!(cache.registration("next", "auth").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_eviction_removes_payload() {
        let config = CacheConfig::default().with_max_entries(1);
        let cache: GrantCache<GrantResponse> = GrantCache::new(config).unwrap();

        cache
            .register_at("a", "auth", &GrantResponse::read_only("a", "auth").with_ttl(5), 0)
            .unwrap();
        cache
            .register_at("b", "auth", &GrantResponse::read_only("b", "auth").with_ttl(5), 0)
            .unwrap();

        let evicted = CacheKey::derive("a", "auth").unwrap();
        assert!(!cache.stores.registrations.contains(&evicted));
        assert!(!cache.stores.payloads.contains(&evicted));
        assert_eq!(cache.stores.payloads.len(), 1);
    }

    #[tokio::test]
    async fn test_sweep_racing_register_never_orphans_payload() {
        let cache = cache();
        let names: Vec<String> = (0..8).map(|i| format!("ch-{i}")).collect();

        std::thread::scope(|s| {
            for (t, ttl) in [(0, -1), (1, 60), (2, -1), (3, 60)] {
                let cache = &cache;
                let names = &names;
                s.spawn(move || {
                    for round in 0..200 {
                        let name = &names[(round + t) % names.len()];
                        let grant = GrantResponse::read_write(name, "auth").with_ttl(ttl);
                        cache.register(name, "auth", &grant).unwrap();
                        if round % 7 == 0 {
                            cache.unregister(name, "auth").unwrap();
                        }
                    }
                });
            }
            s.spawn(|| {
                for _ in 0..200 {
                    cache.purge_expired();
                }
            });
        });

        for name in &names {
            let key = CacheKey::derive(name, "auth").unwrap();
            assert_eq!(
                cache.stores.registrations.contains(&key),
                cache.stores.payloads.contains(&key),
                "stores disagree for {name}"
            );
        }
        assert_eq!(cache.stores.registrations.len(), cache.stores.payloads.len());
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = cache();
        cache
            .register("ch", "auth", &GrantResponse::read_only("ch", "auth"))
            .unwrap();
        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.cached_registration("ch", "auth").unwrap().is_none());
    }

    #[test]
    fn test_new_outside_runtime_fails() {
        let err = GrantCache::<GrantResponse>::with_defaults().unwrap_err();
        assert!(matches!(err, CacheError::Runtime(_)));
    }
}
