//! Read side of the persisted privacy configuration.

use std::sync::Arc;

use crate::Result;
use crate::models::PrivacyFeatureName;
use crate::storage::FeatureStore;

/// Answers feature and exception queries against stored toggles.
pub struct FeatureGate {
    store: Arc<dyn FeatureStore>,
    app_version: i64,
}

impl FeatureGate {
    /// Creates a gate for the given app version code.
    #[must_use]
    pub fn new(store: Arc<dyn FeatureStore>, app_version: i64) -> Self {
        Self { store, app_version }
    }

    /// App version code the gate evaluates against.
    #[must_use]
    pub const fn app_version(&self) -> i64 {
        self.app_version
    }

    /// Returns whether `feature` is on for this app version.
    ///
    /// A feature that was never imported is off.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be read.
    pub fn is_enabled(&self, feature: PrivacyFeatureName) -> Result<bool> {
        self.is_enabled_or(feature, false)
    }

    /// Like [`Self::is_enabled`], with `default` for a feature that was never
    /// imported.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be read.
    pub fn is_enabled_or(&self, feature: PrivacyFeatureName, default: bool) -> Result<bool> {
        Ok(self
            .store
            .get_toggle(feature.as_str())?
            .map_or(default, |toggle| toggle.is_enabled_for(self.app_version)))
    }

    /// Returns whether `host` matches an exception of `feature`, either
    /// exactly or as a subdomain.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be read.
    pub fn is_exception(&self, feature: PrivacyFeatureName, host: &str) -> Result<bool> {
        Ok(self
            .store
            .list_exceptions(feature.as_str())?
            .iter()
            .any(|entry| same_or_subdomain(host, &entry.domain)))
    }

    /// Returns whether protected media playback may run on `host`.
    ///
    /// DRM is allowed only on excepted hosts, and only while the feature is
    /// enabled. A DRM toggle that was never imported counts as enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be read.
    pub fn is_drm_allowed(&self, host: &str) -> Result<bool> {
        Ok(self.is_enabled_or(PrivacyFeatureName::Drm, true)?
            && self.is_exception(PrivacyFeatureName::Drm, host)?)
    }
}

/// Returns true if `host` equals `domain` or is a subdomain of it.
///
/// Comparison ignores ASCII case and a trailing dot.
#[must_use]
pub fn same_or_subdomain(host: &str, domain: &str) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    let domain = domain.trim_end_matches('.').to_ascii_lowercase();
    if host.is_empty() || domain.is_empty() {
        return false;
    }
    host == domain
        || host
            .strip_suffix(domain.as_str())
            .is_some_and(|prefix| prefix.ends_with('.'))
}
