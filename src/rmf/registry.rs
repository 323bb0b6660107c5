//! Ordered matching attribute plugin registry.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::instrument;

use crate::models::{JsonMatchingAttribute, MatchingAttribute};
use crate::{Error, Result};

use super::app_version::AppVersionPlugin;
use super::locale::LocalePlugin;
use super::state::{AppBuildConfig, LocaleProvider, NetworkProtectionState};
use super::traits::MatchingAttributePlugin;
use super::vpn::VpnOnboardedPlugin;

/// Result of mapping every attribute of a remote message.
#[derive(Debug, Default)]
pub struct MappedAttributes {
    /// Typed attributes in input order.
    pub attributes: Vec<MatchingAttribute>,
    /// Keys no plugin recognized.
    pub unrecognized: Vec<String>,
    /// Recognized attributes whose value had the wrong type.
    pub rejected: Vec<Error>,
}

/// Ordered list of matching attribute plugins.
///
/// Mapping and evaluation both ask the plugins in registration order and
/// stop at the first one that answers.
pub struct MatchingAttributeRegistry {
    plugins: Vec<Arc<dyn MatchingAttributePlugin>>,
}

/// Builder for [`MatchingAttributeRegistry`].
#[derive(Default)]
pub struct MatchingAttributeRegistryBuilder {
    plugins: Vec<Arc<dyn MatchingAttributePlugin>>,
}

impl MatchingAttributeRegistryBuilder {
    /// Appends a plugin.
    #[must_use]
    pub fn with(mut self, plugin: impl MatchingAttributePlugin + 'static) -> Self {
        self.plugins.push(Arc::new(plugin));
        self
    }

    /// Builds the registry.
    #[must_use]
    pub fn build(self) -> MatchingAttributeRegistry {
        MatchingAttributeRegistry {
            plugins: self.plugins,
        }
    }
}

impl MatchingAttributeRegistry {
    /// Starts an empty registry builder.
    #[must_use]
    pub fn builder() -> MatchingAttributeRegistryBuilder {
        MatchingAttributeRegistryBuilder::default()
    }

    /// Registers the VPN, app version and locale plugins over one state
    /// source.
    #[must_use]
    pub fn with_device_state<S>(state: &Arc<S>) -> Self
    where
        S: NetworkProtectionState + AppBuildConfig + LocaleProvider + 'static,
    {
        let vpn: Arc<dyn NetworkProtectionState> = state.clone();
        let build: Arc<dyn AppBuildConfig> = state.clone();
        let locale: Arc<dyn LocaleProvider> = state.clone();

        Self::builder()
            .with(VpnOnboardedPlugin::new(vpn))
            .with(AppVersionPlugin::new(build))
            .with(LocalePlugin::new(locale))
            .build()
    }

    /// Maps one attribute.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] from the plugin owning `key`.
    pub fn map(&self, key: &str, json: &JsonMatchingAttribute) -> Result<Option<MatchingAttribute>> {
        for plugin in &self.plugins {
            if let Some(attribute) = plugin.map(key, json)? {
                return Ok(Some(attribute));
            }
        }
        Ok(None)
    }

    /// Maps every attribute of a remote message's `matchingAttributes`
    /// object.
    ///
    /// Unrecognized keys and type mismatches are logged and skipped; the
    /// remaining attributes are still mapped.
    #[instrument(skip_all, fields(attributes = attributes.len()))]
    pub fn map_all(&self, attributes: &Map<String, Value>) -> MappedAttributes {
        let mut mapped = MappedAttributes::default();

        for (key, raw) in attributes {
            match self.map(key, &JsonMatchingAttribute::from_json(raw)) {
                Ok(Some(attribute)) => mapped.attributes.push(attribute),
                Ok(None) => {
                    tracing::debug!(key = %key, "unrecognized matching attribute");
                    mapped.unrecognized.push(key.clone());
                },
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "skipping malformed matching attribute");
                    mapped.rejected.push(e);
                },
            }
        }

        mapped
    }

    /// Evaluates one attribute with the first plugin that owns it.
    ///
    /// Returns `Ok(None)` if no plugin owns the variant.
    ///
    /// # Errors
    ///
    /// Returns the state provider error of the owning plugin.
    #[instrument(skip(self), fields(key = attribute.key()))]
    pub async fn evaluate(&self, attribute: &MatchingAttribute) -> Result<Option<bool>> {
        let mut outcome = Ok(None);
        for plugin in &self.plugins {
            outcome = plugin.evaluate(attribute).await;
            if !matches!(outcome, Ok(None)) {
                break;
            }
        }

        let result = match &outcome {
            Ok(Some(true)) => "true",
            Ok(Some(false)) => "false",
            Ok(None) => "unclaimed",
            Err(_) => "error",
        };
        metrics::counter!(
            "attribute_evaluations_total",
            "key" => attribute.key(),
            "result" => result
        )
        .increment(1);

        outcome
    }

    /// Returns true only if every attribute evaluates to `true`.
    ///
    /// Evaluation stops at the first attribute that is false or that no
    /// plugin owns.
    ///
    /// # Errors
    ///
    /// Returns the first state provider error.
    pub async fn matches_all(&self, attributes: &[MatchingAttribute]) -> Result<bool> {
        for attribute in attributes {
            if self.evaluate(attribute).await? != Some(true) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VPN_ONBOARDED_KEY;
    use crate::rmf::{AttributeMatcherPlugin, JsonToMatchingAttributeMapper, StaticDeviceState};
    use async_trait::async_trait;
    use serde_json::json;

    fn device() -> Arc<StaticDeviceState> {
        Arc::new(StaticDeviceState {
            onboarded: true,
            version_code: 52100,
            locale: "en-US".to_string(),
        })
    }

    /// Plugin that owns nothing.
    struct Silent;

    impl JsonToMatchingAttributeMapper for Silent {
        fn map(&self, _key: &str, _json: &JsonMatchingAttribute) -> Result<Option<MatchingAttribute>> {
            Ok(None)
        }
    }

    #[async_trait]
    impl AttributeMatcherPlugin for Silent {
        async fn evaluate(&self, _attribute: &MatchingAttribute) -> Result<Option<bool>> {
            Ok(None)
        }
    }

    #[test]
    fn test_map_unknown_key_is_none() {
        let registry = MatchingAttributeRegistry::with_device_state(&device());
        let json = JsonMatchingAttribute::from_scalar(true);
        assert_eq!(registry.map("emailEnabled", &json).unwrap(), None);
    }

    #[test]
    fn test_map_all_skips_mismatches() {
        let registry = MatchingAttributeRegistry::with_device_state(&device());
        let attributes = json!({
            "netpOnboarded": "maybe",
            "appVersion": {"min": 52000},
            "locale": ["en-US"],
            "daysSinceInstalled": {"min": 3}
        });

        let mapped = registry.map_all(attributes.as_object().unwrap());
        assert_eq!(mapped.attributes.len(), 2);
        assert!(mapped.attributes.contains(&MatchingAttribute::AppVersion {
            min: Some(52000),
            max: None
        }));
        assert_eq!(mapped.unrecognized, vec!["daysSinceInstalled".to_string()]);
        assert_eq!(mapped.rejected.len(), 1);
        assert!(matches!(
            &mapped.rejected[0],
            Error::TypeMismatch { key, .. } if key == VPN_ONBOARDED_KEY
        ));
    }

    #[test]
    fn test_map_all_keeps_input_order() {
        let registry = MatchingAttributeRegistry::with_device_state(&device());
        let attributes = json!({
            "locale": "en-US",
            "netpOnboarded": false,
            "appVersion": 52100
        });

        let keys: Vec<_> = registry
            .map_all(attributes.as_object().unwrap())
            .attributes
            .iter()
            .map(MatchingAttribute::key)
            .collect();
        assert_eq!(keys, vec!["locale", "netpOnboarded", "appVersion"]);
    }

    #[tokio::test]
    async fn test_evaluate_first_answer_wins() {
        let registry = MatchingAttributeRegistry::builder()
            .with(Silent)
            .with(VpnOnboardedPlugin::new(device()))
            .build();

        let attribute = MatchingAttribute::VpnOnboarded { remote_value: true };
        assert_eq!(registry.evaluate(&attribute).await.unwrap(), Some(true));

        let unowned = MatchingAttribute::Locale {
            values: vec!["en-US".to_string()],
        };
        assert_eq!(registry.evaluate(&unowned).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_matches_all() {
        let registry = MatchingAttributeRegistry::with_device_state(&device());
        let matching = vec![
            MatchingAttribute::VpnOnboarded { remote_value: true },
            MatchingAttribute::AppVersion {
                min: Some(52000),
                max: None,
            },
            MatchingAttribute::Locale {
                values: vec!["en_us".to_string()],
            },
        ];
        assert!(registry.matches_all(&matching).await.unwrap());

        let mut failing = matching;
        failing.push(MatchingAttribute::VpnOnboarded { remote_value: false });
        assert!(!registry.matches_all(&failing).await.unwrap());

        let empty = MatchingAttributeRegistry::builder().build();
        assert!(!empty
            .matches_all(&[MatchingAttribute::VpnOnboarded { remote_value: true }])
            .await
            .unwrap());
    }
}
