//! VPN onboarding attribute (`netpOnboarded`).

use std::sync::Arc;

use async_trait::async_trait;

use crate::Result;
use crate::models::{JsonMatchingAttribute, MatchingAttribute, VPN_ONBOARDED_KEY};

use super::state::NetworkProtectionState;
use super::traits::{AttributeMatcherPlugin, JsonToMatchingAttributeMapper};

/// Owns the `netpOnboarded` key and [`MatchingAttribute::VpnOnboarded`].
pub struct VpnOnboardedPlugin {
    state: Arc<dyn NetworkProtectionState>,
}

impl VpnOnboardedPlugin {
    /// Creates the plugin over a VPN state provider.
    #[must_use]
    pub fn new(state: Arc<dyn NetworkProtectionState>) -> Self {
        Self { state }
    }
}

impl JsonToMatchingAttributeMapper for VpnOnboardedPlugin {
    fn map(&self, key: &str, json: &JsonMatchingAttribute) -> Result<Option<MatchingAttribute>> {
        if key != VPN_ONBOARDED_KEY {
            return Ok(None);
        }
        Ok(Some(MatchingAttribute::VpnOnboarded {
            remote_value: json.as_bool(key)?,
        }))
    }
}

#[async_trait]
impl AttributeMatcherPlugin for VpnOnboardedPlugin {
    async fn evaluate(&self, attribute: &MatchingAttribute) -> Result<Option<bool>> {
        let MatchingAttribute::VpnOnboarded { remote_value } = attribute else {
            return Ok(None);
        };
        let onboarded = self.state.is_onboarded().await?;
        Ok(Some(onboarded == *remote_value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::models::APP_VERSION_KEY;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Provider that counts queries and can fail.
    struct CountingState {
        onboarded: bool,
        fail: bool,
        calls: AtomicUsize,
    }

    impl CountingState {
        fn new(onboarded: bool) -> Self {
            Self {
                onboarded,
                fail: false,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl NetworkProtectionState for CountingState {
        async fn is_onboarded(&self) -> Result<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::StateUnavailable {
                    provider: "network_protection",
                    cause: "service not bound".to_string(),
                });
            }
            Ok(self.onboarded)
        }
    }

    #[test]
    fn test_map_owned_key() {
        let plugin = VpnOnboardedPlugin::new(Arc::new(CountingState::new(true)));

        let mapped = plugin
            .map(VPN_ONBOARDED_KEY, &JsonMatchingAttribute::from_json(&json!(true)))
            .unwrap();
        assert_eq!(mapped, Some(MatchingAttribute::VpnOnboarded { remote_value: true }));

        let wrapped = plugin
            .map(
                VPN_ONBOARDED_KEY,
                &JsonMatchingAttribute::from_json(&json!({"value": false})),
            )
            .unwrap();
        assert_eq!(wrapped, Some(MatchingAttribute::VpnOnboarded { remote_value: false }));
    }

    #[test]
    fn test_map_foreign_key() {
        let plugin = VpnOnboardedPlugin::new(Arc::new(CountingState::new(true)));
        let json = JsonMatchingAttribute::from_scalar(true);
        assert_eq!(plugin.map("unknownKey", &json).unwrap(), None);
        assert_eq!(plugin.map(APP_VERSION_KEY, &json).unwrap(), None);
    }

    #[test]
    fn test_map_type_mismatch() {
        let plugin = VpnOnboardedPlugin::new(Arc::new(CountingState::new(true)));
        let err = plugin
            .map(VPN_ONBOARDED_KEY, &JsonMatchingAttribute::from_scalar("yes"))
            .unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { ref key, .. } if key == VPN_ONBOARDED_KEY));
    }

    #[tokio::test]
    async fn test_evaluate_compares_with_state() {
        for (onboarded, remote_value, expected) in [
            (true, true, true),
            (false, true, false),
            (false, false, true),
            (true, false, false),
        ] {
            let state = Arc::new(CountingState::new(onboarded));
            let plugin = VpnOnboardedPlugin::new(state.clone());
            let result = plugin
                .evaluate(&MatchingAttribute::VpnOnboarded { remote_value })
                .await
                .unwrap();
            assert_eq!(result, Some(expected));
            assert_eq!(state.calls.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test]
    async fn test_evaluate_foreign_variant_skips_state() {
        let state = Arc::new(CountingState::new(true));
        let plugin = VpnOnboardedPlugin::new(state.clone());
        let result = plugin
            .evaluate(&MatchingAttribute::AppVersion {
                min: Some(1),
                max: None,
            })
            .await
            .unwrap();
        assert_eq!(result, None);
        assert_eq!(state.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_evaluate_propagates_provider_error() {
        let state = Arc::new(CountingState {
            fail: true,
            ..CountingState::new(true)
        });
        let plugin = VpnOnboardedPlugin::new(state.clone());
        let err = plugin
            .evaluate(&MatchingAttribute::VpnOnboarded { remote_value: true })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::StateUnavailable { provider: "network_protection", .. }));
        assert_eq!(state.calls.load(Ordering::SeqCst), 1);
    }
}
