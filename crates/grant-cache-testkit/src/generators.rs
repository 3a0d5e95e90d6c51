//! Proptest generators for property-based testing.

use proptest::prelude::*;

use grant_cache::{AccessType, GrantResponse};

/// Generate a non-empty resource id.
pub fn resource_id() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9._-]{0,31}".prop_map(String::from)
}

/// Generate a non-empty credential.
pub fn credential() -> impl Strategy<Value = String> {
    "[A-Za-z0-9+/=-]{1,48}".prop_map(String::from)
}

/// Generate an access type.
pub fn access_type() -> impl Strategy<Value = AccessType> {
    prop_oneof![Just(AccessType::Read), Just(AccessType::Write)]
}

/// Generate a TTL in minutes, including expired (negative) values.
pub fn ttl_minutes() -> impl Strategy<Value = i64> {
    -1440i64..=10_080
}

/// Generate printable text, including the empty string.
pub fn printable_text() -> impl Strategy<Value = String> {
    "[ -~]{0,64}"
}

/// Generate a grant response with arbitrary flags and printable fields.
pub fn grant_response() -> impl Strategy<Value = GrantResponse> {
    (
        printable_text(),
        printable_text(),
        resource_id(),
        prop::collection::vec(credential(), 0..4),
        any::<(bool, bool, bool)>(),
        ttl_minutes(),
    )
        .prop_map(
            |(level, subscribe_key, resource, auth_keys, (read, write, manage), ttl_minutes)| {
                GrantResponse {
                    level,
                    subscribe_key,
                    resource,
                    auth_keys,
                    read,
                    write,
                    manage,
                    ttl_minutes,
                }
            },
        )
}

/// Parameters for registering a grant.
#[derive(Debug, Clone)]
pub struct RegistrationParams {
    pub resource_id: String,
    pub credential: String,
    pub grant: GrantResponse,
}

impl Arbitrary for RegistrationParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (resource_id(), credential(), grant_response())
            .prop_map(|(resource_id, credential, grant)| RegistrationParams {
                resource_id,
                credential,
                grant,
            })
            .boxed()
    }
}
