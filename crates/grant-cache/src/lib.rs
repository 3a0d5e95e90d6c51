//! # Grant Cache
//!
//! A time-bounded, concurrently accessed cache of access grants.
//!
//! ## Overview
//!
//! After a remote authorization service approves read and/or write access
//! for a (resource, credential) pair, the grant is registered here. Later
//! access decisions ask the cache whether the permission is still valid,
//! and the full grant response can be reconstructed without another
//! round-trip.
//!
//! ## Key Types
//!
//! - [`GrantCache`] - The public API
//! - [`CacheKey`] - Key derived from resource id and credential
//! - [`RegistrationStore`] - Per-key read/write expiry timestamps (hot path)
//! - [`PayloadStore`] - Compressed, serialized grant responses
//! - [`Sweeper`] - Background task purging fully-expired entries
//! - [`Grant`] - What the cache needs from a grant response
//!
//! ## Usage
//!
//! ```rust,no_run
//! use grant_cache::{AccessType, CacheConfig, GrantCache, GrantResponse};
//! use std::time::Duration;
//!
//! async fn example() -> grant_cache::Result<()> {
//!     let config = CacheConfig::default().with_sweep_period(Duration::from_secs(600));
//!     let cache: GrantCache<GrantResponse> = GrantCache::new(config)?;
//!
//!     let grant = GrantResponse::read_only("my-channel", "auth-key").with_ttl(30);
//!     cache.register("my-channel", "auth-key", &grant)?;
//!
//!     if cache.granted("my-channel", "auth-key", AccessType::Read)? {
//!         let cached = cache.cached_registration("my-channel", "auth-key")?;
//!         assert_eq!(cached, Some(grant));
//!     }
//!
//!     cache.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **No global lock**: both stores are sharded concurrent maps.
//! - **Split stores**: metadata and payload live in separate maps, but each
//!   key's payload is written or removed under its registration shard lock,
//!   so writers never leave metadata without a payload.
//! - **Time-based eviction**: expired entries answer `false`/`None`
//!   immediately and are physically removed by the next sweep.

pub mod cache;
pub mod config;
pub mod error;
pub mod grant;
pub mod key;
pub mod payload;
pub mod registration;
pub mod sweeper;

pub use cache::GrantCache;
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use grant::{AccessType, Grant, GrantResponse};
pub use key::CacheKey;
pub use payload::PayloadStore;
pub use registration::{now_millis, AccessRegistration, RegistrationStore};
pub use sweeper::{SweepReport, Sweeper};
