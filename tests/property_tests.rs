//! Property-based tests for feature import and attribute matching.
//!
//! Uses proptest to check invariants across random inputs:
//! - Unowned feature names never reach storage
//! - Toggle state follows the payload `state`
//! - Re-import replaces the exception set
//! - Subdomain matching rejects lookalike suffixes
//! - Unknown attribute keys are never claimed

// Property tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;

use proptest::prelude::*;
use remoteconf::privacy::{ExceptionListPlugin, PrivacyFeaturePlugin, same_or_subdomain};
use remoteconf::rmf::{MatchingAttributeRegistry, StaticDeviceState};
use remoteconf::storage::{FeatureStore, InMemoryFeatureStore};
use remoteconf::{ExceptionEntry, JsonMatchingAttribute};
use serde_json::json;

fn drm_plugin() -> (Arc<dyn FeatureStore>, ExceptionListPlugin) {
    let store: Arc<dyn FeatureStore> = Arc::new(InMemoryFeatureStore::new());
    let plugin = ExceptionListPlugin::drm(Arc::clone(&store));
    (store, plugin)
}

fn payload(state: &str, domains: &[String]) -> String {
    let exceptions: Vec<_> = domains
        .iter()
        .map(|d| json!({"domain": d, "reason": "r"}))
        .collect();
    json!({"state": state, "exceptions": exceptions}).to_string()
}

proptest! {
    /// Property: names other than `drm` are declined without any write.
    #[test]
    fn prop_unowned_feature_never_persists(
        name in "[a-zA-Z]{0,16}".prop_filter("owned name", |n| n != "drm"),
        body in ".{0,64}",
    ) {
        let (store, plugin) = drm_plugin();
        prop_assert!(!plugin.try_import(&name, &body).unwrap());
        prop_assert!(store.list_toggles().unwrap().is_empty());
        prop_assert!(store.list_exceptions(&name).unwrap().is_empty());
    }

    /// Property: only `"enabled"` enables the feature.
    #[test]
    fn prop_enabled_only_for_enabled_state(state in prop_oneof![
        Just("enabled".to_string()),
        Just("disabled".to_string()),
        "[a-z]{0,10}",
    ]) {
        let (store, plugin) = drm_plugin();
        prop_assert!(plugin.try_import("drm", &payload(&state, &[])).unwrap());
        let toggle = store.get_toggle("drm").unwrap().unwrap();
        prop_assert_eq!(toggle.enabled, state == "enabled");
    }

    /// Property: after two imports only the second exception list remains.
    #[test]
    fn prop_reimport_replaces_exceptions(
        first in prop::collection::vec("[a-z]{1,8}\\.com", 0..6),
        second in prop::collection::vec("[a-z]{1,8}\\.org", 0..6),
    ) {
        let (store, plugin) = drm_plugin();
        plugin.try_import("drm", &payload("enabled", &first)).unwrap();
        plugin.try_import("drm", &payload("enabled", &second)).unwrap();

        let expected: Vec<_> = second.iter().map(|d| ExceptionEntry::new(d.as_str(), "r")).collect();
        prop_assert_eq!(store.list_exceptions("drm").unwrap(), expected);
    }

    /// Property: arbitrary text never fails the import; it disables the
    /// feature unless it happens to be a valid payload.
    #[test]
    fn prop_import_never_errors_on_garbage(body in ".{0,128}") {
        let (store, plugin) = drm_plugin();
        prop_assert!(plugin.try_import("drm", &body).unwrap());
        prop_assert!(store.get_toggle("drm").unwrap().is_some());
    }

    /// Property: prefixing labels yields a subdomain; gluing text does not.
    #[test]
    fn prop_subdomain_matching(
        domain in "[a-z]{1,10}\\.[a-z]{2,3}",
        label in "[a-z0-9]{1,10}",
    ) {
        let sub = format!("{label}.{domain}");
        let glued = format!("{label}{domain}");
        prop_assert!(same_or_subdomain(&domain, &domain));
        prop_assert!(same_or_subdomain(&sub, &domain));
        prop_assert!(!same_or_subdomain(&glued, &domain));
        prop_assert!(!same_or_subdomain(&domain, &sub));
    }

    /// Property: keys outside the attribute set are never mapped.
    #[test]
    fn prop_unknown_attribute_keys_unclaimed(
        key in "[a-zA-Z]{1,20}".prop_filter("known key", |k| {
            !matches!(k.as_str(), "netpOnboarded" | "appVersion" | "locale")
        }),
        value in any::<bool>(),
    ) {
        let registry = MatchingAttributeRegistry::with_device_state(&Arc::new(StaticDeviceState::default()));
        let mapped = registry.map(&key, &JsonMatchingAttribute::from_scalar(value)).unwrap();
        prop_assert!(mapped.is_none());
    }
}
