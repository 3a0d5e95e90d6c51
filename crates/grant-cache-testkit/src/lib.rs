//! # Grant Cache Testkit
//!
//! Testing utilities for the grant cache.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Generators**: Proptest strategies for grants, resource ids and credentials
//! - **Fixtures**: A ready-made cache with a fixed (resource, credential) pair
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use grant_cache_testkit::generators::RegistrationParams;
//!
//! proptest! {
//!     #[test]
//!     fn key_is_deterministic(params: RegistrationParams) {
//!         let k1 = grant_cache::CacheKey::derive(&params.resource_id, &params.credential).unwrap();
//!         let k2 = grant_cache::CacheKey::derive(&params.resource_id, &params.credential).unwrap();
//!         prop_assert_eq!(k1, k2);
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use grant_cache_testkit::fixtures::TestFixture;
//!
//! # async fn example() {
//! let fixture = TestFixture::new();
//! fixture.register(&fixture.read_grant(30));
//! # }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{distinct_pairs, TestFixture};
pub use generators::{grant_response, RegistrationParams};
