//! Ordered importer registry.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::instrument;

use crate::models::PrivacyFeatureName;
use crate::storage::FeatureStore;
use crate::{Error, Result};

use super::plugin::{ExceptionListPlugin, PrivacyFeaturePlugin};

/// Outcome of ingesting a full privacy configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Document `version`, if present and numeric.
    pub version: Option<i64>,
    /// Features claimed and persisted, in document order.
    pub claimed: Vec<PrivacyFeatureName>,
    /// Feature names no importer claimed.
    pub unclaimed: Vec<String>,
    /// Features whose import failed, with the error message.
    pub failed: Vec<(String, String)>,
}

impl IngestReport {
    /// Returns true if every claimed feature was persisted.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Ordered list of privacy feature importers.
///
/// Each `(feature_name, json)` pair is offered to the importers in
/// registration order and the first `Ok(true)` stops dispatch. Registering
/// two importers for the same feature is allowed; only the first one ever
/// sees its payloads.
pub struct PrivacyFeatureRegistry {
    plugins: Vec<Arc<dyn PrivacyFeaturePlugin>>,
}

/// Builder for [`PrivacyFeatureRegistry`].
#[derive(Default)]
pub struct PrivacyFeatureRegistryBuilder {
    plugins: Vec<Arc<dyn PrivacyFeaturePlugin>>,
}

impl PrivacyFeatureRegistryBuilder {
    /// Appends an importer.
    #[must_use]
    pub fn with(mut self, plugin: impl PrivacyFeaturePlugin + 'static) -> Self {
        self.plugins.push(Arc::new(plugin));
        self
    }

    /// Appends a shared importer.
    #[must_use]
    pub fn with_shared(mut self, plugin: Arc<dyn PrivacyFeaturePlugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Builds the registry.
    #[must_use]
    pub fn build(self) -> PrivacyFeatureRegistry {
        PrivacyFeatureRegistry {
            plugins: self.plugins,
        }
    }
}

impl PrivacyFeatureRegistry {
    /// Starts an empty registry builder.
    #[must_use]
    pub fn builder() -> PrivacyFeatureRegistryBuilder {
        PrivacyFeatureRegistryBuilder::default()
    }

    /// Creates a registry with an exception-list importer for every known
    /// feature, in [`PrivacyFeatureName::all`] order.
    #[must_use]
    pub fn with_exception_lists(store: &Arc<dyn FeatureStore>) -> Self {
        PrivacyFeatureName::all()
            .iter()
            .fold(Self::builder(), |builder, feature| {
                builder.with(ExceptionListPlugin::new(*feature, Arc::clone(store)))
            })
            .build()
    }

    /// Number of registered importers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Returns true if no importers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Offers one feature payload to the importers.
    ///
    /// Returns the feature of the importer that claimed it, or `None` when
    /// no importer did.
    ///
    /// # Errors
    ///
    /// Returns the persistence error of the claiming importer. Dispatch stops
    /// at the first error.
    #[instrument(skip(self, json), fields(plugins = self.plugins.len()))]
    pub fn dispatch(&self, feature_name: &str, json: &str) -> Result<Option<PrivacyFeatureName>> {
        for plugin in &self.plugins {
            if plugin.try_import(feature_name, json)? {
                return Ok(Some(plugin.feature_name()));
            }
        }
        tracing::debug!("no importer claimed feature");
        Ok(None)
    }

    /// Ingests a full privacy configuration document of the form
    /// `{"version": N, "features": {"<name>": {...}}}`.
    ///
    /// Every entry of `features` is dispatched independently; a failing
    /// feature is recorded in the report and does not stop the others.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the document is not a JSON object
    /// or its `features` member is not an object.
    #[instrument(skip(self, document), fields(document.len = document.len()))]
    pub fn ingest(&self, document: &str) -> Result<IngestReport> {
        let root: Value = serde_json::from_str(document)
            .map_err(|e| Error::InvalidInput(format!("privacy config is not JSON: {e}")))?;

        let features = root
            .get("features")
            .and_then(Value::as_object)
            .ok_or_else(|| {
                Error::InvalidInput("privacy config has no 'features' object".to_string())
            })?;

        let mut report = IngestReport {
            version: root.get("version").and_then(Value::as_i64),
            ..IngestReport::default()
        };

        for (name, payload) in features {
            match self.dispatch(name, &payload.to_string()) {
                Ok(Some(feature)) => report.claimed.push(feature),
                Ok(None) => report.unclaimed.push(name.clone()),
                Err(e) => {
                    tracing::error!(feature = %name, error = %e, "feature import failed");
                    report.failed.push((name.clone(), e.to_string()));
                },
            }
        }

        tracing::info!(
            version = ?report.version,
            claimed = report.claimed.len(),
            unclaimed = report.unclaimed.len(),
            failed = report.failed.len(),
            "privacy config ingested"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryFeatureStore;
    use std::sync::Mutex;

    /// Importer that records every offer and claims a fixed feature.
    struct ProbePlugin {
        feature: PrivacyFeatureName,
        offers: Arc<Mutex<Vec<String>>>,
    }

    impl PrivacyFeaturePlugin for ProbePlugin {
        fn feature_name(&self) -> PrivacyFeatureName {
            self.feature
        }

        fn try_import(&self, feature_name: &str, _json: &str) -> Result<bool> {
            self.offers
                .lock()
                .unwrap()
                .push(format!("{}:{feature_name}", self.feature));
            Ok(feature_name == self.feature.as_str())
        }
    }

    fn probe(feature: PrivacyFeatureName, offers: &Arc<Mutex<Vec<String>>>) -> ProbePlugin {
        ProbePlugin {
            feature,
            offers: Arc::clone(offers),
        }
    }

    #[test]
    fn test_first_claim_wins() {
        let offers = Arc::new(Mutex::new(Vec::new()));
        let registry = PrivacyFeatureRegistry::builder()
            .with(probe(PrivacyFeatureName::Gpc, &offers))
            .with(probe(PrivacyFeatureName::Drm, &offers))
            .with(probe(PrivacyFeatureName::Drm, &offers))
            .build();

        let claimed = registry.dispatch("drm", "{}").unwrap();
        assert_eq!(claimed, Some(PrivacyFeatureName::Drm));
        assert_eq!(*offers.lock().unwrap(), vec!["gpc:drm", "drm:drm"]);
    }

    #[test]
    fn test_unclaimed_feature_visits_every_plugin() {
        let offers = Arc::new(Mutex::new(Vec::new()));
        let registry = PrivacyFeatureRegistry::builder()
            .with(probe(PrivacyFeatureName::Gpc, &offers))
            .with(probe(PrivacyFeatureName::Drm, &offers))
            .build();

        assert_eq!(registry.dispatch("unknownFeature", "{}").unwrap(), None);
        assert_eq!(offers.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_with_exception_lists_covers_every_feature() {
        let store: Arc<dyn FeatureStore> = Arc::new(InMemoryFeatureStore::new());
        let registry = PrivacyFeatureRegistry::with_exception_lists(&store);
        assert_eq!(registry.len(), PrivacyFeatureName::all().len());

        for feature in PrivacyFeatureName::all() {
            assert_eq!(
                registry.dispatch(feature.as_str(), r#"{"state":"enabled"}"#).unwrap(),
                Some(*feature)
            );
        }
        assert_eq!(store.list_toggles().unwrap().len(), PrivacyFeatureName::all().len());
    }

    #[test]
    fn test_ingest_document() {
        let store: Arc<dyn FeatureStore> = Arc::new(InMemoryFeatureStore::new());
        let registry = PrivacyFeatureRegistry::builder()
            .with(ExceptionListPlugin::drm(Arc::clone(&store)))
            .build();

        let report = registry
            .ingest(
                r#"{
                    "version": 1712345,
                    "features": {
                        "drm": {"state": "enabled", "exceptions": [{"domain": "netflix.com"}]},
                        "gpc": {"state": "enabled"}
                    }
                }"#,
            )
            .unwrap();

        assert_eq!(report.version, Some(1_712_345));
        assert_eq!(report.claimed, vec![PrivacyFeatureName::Drm]);
        assert_eq!(report.unclaimed, vec!["gpc".to_string()]);
        assert!(report.is_success());
        assert!(store.get_toggle("drm").unwrap().unwrap().enabled);
        assert_eq!(store.get_toggle("gpc").unwrap(), None);
    }

    #[test]
    fn test_ingest_keeps_document_order() {
        let store: Arc<dyn FeatureStore> = Arc::new(InMemoryFeatureStore::new());
        let registry = PrivacyFeatureRegistry::with_exception_lists(&store);

        let report = registry
            .ingest(
                r#"{"features": {
                    "gpc": {"state": "enabled"},
                    "zeta": {},
                    "drm": {"state": "enabled"},
                    "alpha": {},
                    "autofill": {"state": "disabled"}
                }}"#,
            )
            .unwrap();

        assert_eq!(
            report.claimed,
            vec![
                PrivacyFeatureName::Gpc,
                PrivacyFeatureName::Drm,
                PrivacyFeatureName::Autofill
            ]
        );
        assert_eq!(report.unclaimed, vec!["zeta".to_string(), "alpha".to_string()]);
    }

    #[test]
    fn test_ingest_rejects_bad_documents() {
        let registry = PrivacyFeatureRegistry::builder().build();
        assert!(registry.is_empty());

        assert!(matches!(registry.ingest("nope"), Err(Error::InvalidInput(_))));
        assert!(matches!(
            registry.ingest(r#"{"version": 1}"#),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            registry.ingest(r#"{"features": []}"#),
            Err(Error::InvalidInput(_))
        ));
    }
}
