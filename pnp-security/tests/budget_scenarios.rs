use pnp_security::{Capability, CredentialRegistry};
use std::collections::HashSet;
use std::time::Duration;

/// Scenario: 101 consecutive requests arriving within one second against a
/// credential with `budget = 100` — the 101st must be rejected with a
/// positive retry delay, the first 100 must all be accepted.
#[test]
fn the_101st_request_within_a_second_is_rate_limited() {
    let registry = CredentialRegistry::new();
    let (id, _secret) = registry
        .create("loadtest", HashSet::from([Capability::Read]), 100, "")
        .unwrap();

    for n in 0..100 {
        assert!(registry.reserve_or_reject(&id).is_ok(), "request {n} should be accepted");
    }

    let rejection = registry.reserve_or_reject(&id).unwrap_err();
    assert!(rejection > Duration::ZERO);
}

#[test]
fn remaining_counts_down_as_requests_are_accepted() {
    let registry = CredentialRegistry::new();
    let (id, _secret) = registry
        .create("loadtest", HashSet::from([Capability::Read]), 10, "")
        .unwrap();

    assert_eq!(registry.remaining(&id), 10);
    registry.reserve_or_reject(&id).unwrap();
    registry.reserve_or_reject(&id).unwrap();
    assert_eq!(registry.remaining(&id), 8);
}

#[test]
fn credentials_do_not_share_budgets() {
    let registry = CredentialRegistry::new();
    let (id_a, _) = registry.create("a", HashSet::from([Capability::Read]), 1, "").unwrap();
    let (id_b, _) = registry.create("b", HashSet::from([Capability::Read]), 1, "").unwrap();

    registry.reserve_or_reject(&id_a).unwrap();
    assert!(registry.reserve_or_reject(&id_a).is_err());
    assert!(registry.reserve_or_reject(&id_b).is_ok());
}

#[test]
fn update_can_revoke_a_capability() {
    let registry = CredentialRegistry::new();
    let (id, secret) = registry
        .create("writer", HashSet::from([Capability::Write]), 5, "")
        .unwrap();

    registry
        .update(&id, None, Some(HashSet::from([Capability::Read])), None, None, None)
        .unwrap();

    let credential = registry.validate(&secret).unwrap();
    assert!(!registry.check_capability(&credential, Capability::Write));
    assert!(registry.check_capability(&credential, Capability::Read));
}

#[test]
fn delete_revokes_authentication_entirely() {
    let registry = CredentialRegistry::new();
    let (id, secret) = registry.create("temp", HashSet::from([Capability::Read]), 5, "").unwrap();
    registry.delete(&id).unwrap();
    assert!(registry.validate(&secret).is_none());
}
