//! Privacy feature importers.

use std::sync::Arc;

use tracing::instrument;

use crate::Result;
use crate::models::{FeatureDescription, FeatureToggle, PrivacyFeatureName};
use crate::storage::FeatureStore;

/// A component that claims one feature of the remote privacy configuration.
///
/// Importers are offered every `(feature_name, json)` pair in registry order;
/// the first one returning `Ok(true)` owns it.
pub trait PrivacyFeaturePlugin: Send + Sync {
    /// The feature this importer owns.
    fn feature_name(&self) -> PrivacyFeatureName;

    /// Imports `json` if `feature_name` is owned by this importer.
    ///
    /// Returns `Ok(false)` without touching storage for any other feature
    /// name, including names outside [`PrivacyFeatureName`]. Returns
    /// `Ok(true)` once the payload has been persisted, whether or not the
    /// stored toggle changed.
    ///
    /// # Errors
    ///
    /// Returns an error only if persistence fails; a malformed payload is
    /// imported as a disabled feature.
    fn try_import(&self, feature_name: &str, json: &str) -> Result<bool>;
}

/// Parses a feature payload, degrading to a disabled feature when the
/// payload is corrupt.
#[must_use]
pub fn parse_feature_or_disabled(feature: PrivacyFeatureName, json: &str) -> FeatureDescription {
    match FeatureDescription::from_json(json) {
        Ok(description) => description,
        Err(e) => {
            tracing::warn!(
                feature = %feature,
                error = %e,
                "malformed feature payload, disabling feature"
            );
            metrics::counter!(
                "feature_payloads_malformed_total",
                "feature" => feature.as_str()
            )
            .increment(1);
            FeatureDescription::disabled()
        },
    }
}

/// Importer for features whose payload is a state, a minimum supported
/// version, and a domain exception list.
///
/// Each import replaces the feature's exceptions and upserts its toggle in a
/// single [`FeatureStore::transaction`].
///
/// # Example
///
/// ```rust,ignore
/// use remoteconf::privacy::{ExceptionListPlugin, PrivacyFeaturePlugin};
///
/// let drm = ExceptionListPlugin::drm(store);
/// assert!(drm.try_import("drm", r#"{"state":"enabled"}"#)?);
/// assert!(!drm.try_import("gpc", r#"{"state":"enabled"}"#)?);
/// ```
pub struct ExceptionListPlugin {
    feature: PrivacyFeatureName,
    store: Arc<dyn FeatureStore>,
}

impl ExceptionListPlugin {
    /// Creates an importer owning `feature`.
    #[must_use]
    pub fn new(feature: PrivacyFeatureName, store: Arc<dyn FeatureStore>) -> Self {
        Self { feature, store }
    }

    /// Creates the DRM importer.
    #[must_use]
    pub fn drm(store: Arc<dyn FeatureStore>) -> Self {
        Self::new(PrivacyFeatureName::Drm, store)
    }

    fn persist(&self, description: &FeatureDescription) -> Result<()> {
        let feature_key = self.feature.as_str();
        let toggle = FeatureToggle::from_description(self.feature, description);

        self.store.transaction(&mut |tx| {
            tx.replace_exceptions(feature_key, &description.exceptions)?;
            tx.upsert_toggle(&toggle)
        })
    }
}

impl PrivacyFeaturePlugin for ExceptionListPlugin {
    fn feature_name(&self) -> PrivacyFeatureName {
        self.feature
    }

    #[instrument(skip(self, json), fields(owner = %self.feature, json.len = json.len()))]
    fn try_import(&self, feature_name: &str, json: &str) -> Result<bool> {
        if PrivacyFeatureName::parse(feature_name) != Some(self.feature) {
            return Ok(false);
        }

        let description = parse_feature_or_disabled(self.feature, json);
        let result = self.persist(&description);

        let outcome = if result.is_ok() { "imported" } else { "error" };
        metrics::counter!(
            "feature_imports_total",
            "feature" => self.feature.as_str(),
            "outcome" => outcome
        )
        .increment(1);

        match result {
            Ok(()) => {
                tracing::debug!(
                    state = description.state.as_str(),
                    min_supported_version = ?description.min_supported_version,
                    exceptions = description.exceptions.len(),
                    "feature imported"
                );
                Ok(true)
            },
            Err(e) => {
                tracing::error!(error = %e, "failed to persist feature");
                Err(e)
            },
        }
    }
}
