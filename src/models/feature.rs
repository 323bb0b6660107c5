//! Privacy feature identities, payloads, and persisted toggles.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Privacy features published by the remote privacy configuration.
///
/// This is the fixed registry every importer resolves feature names against.
/// Names are matched exactly as they appear in the remote document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrivacyFeatureName {
    /// Tracker blocking.
    #[serde(rename = "contentBlocking")]
    ContentBlocking,
    /// Global Privacy Control header.
    #[serde(rename = "gpc")]
    Gpc,
    /// HTTPS upgrades.
    #[serde(rename = "https")]
    Https,
    /// Per-site tracker allowlist.
    #[serde(rename = "trackerAllowlist")]
    TrackerAllowlist,
    /// Protected media playback (encrypted media extensions).
    #[serde(rename = "drm")]
    Drm,
    /// AMP link rewriting.
    #[serde(rename = "ampLinks")]
    AmpLinks,
    /// Tracking parameter stripping.
    #[serde(rename = "trackingParameters")]
    TrackingParameters,
    /// Cookie consent pop-up handling.
    #[serde(rename = "autoconsent")]
    Autoconsent,
    /// Credential autofill.
    #[serde(rename = "autofill")]
    Autofill,
}

impl PrivacyFeatureName {
    /// Returns all feature variants in registry order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::ContentBlocking,
            Self::Gpc,
            Self::Https,
            Self::TrackerAllowlist,
            Self::Drm,
            Self::AmpLinks,
            Self::TrackingParameters,
            Self::Autoconsent,
            Self::Autofill,
        ]
    }

    /// Returns the feature key as published in the remote config.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ContentBlocking => "contentBlocking",
            Self::Gpc => "gpc",
            Self::Https => "https",
            Self::TrackerAllowlist => "trackerAllowlist",
            Self::Drm => "drm",
            Self::AmpLinks => "ampLinks",
            Self::TrackingParameters => "trackingParameters",
            Self::Autoconsent => "autoconsent",
            Self::Autofill => "autofill",
        }
    }

    /// Resolves a feature key.
    ///
    /// Returns `None` for names outside the registry.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::all().iter().copied().find(|f| f.as_str() == s)
    }
}

impl fmt::Display for PrivacyFeatureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Published state of a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureState {
    /// The feature is on.
    Enabled,
    /// The feature is off. Also used for absent or unrecognized states.
    #[default]
    Disabled,
}

impl FeatureState {
    /// Parses a state string. Anything other than `"enabled"` is disabled.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s == "enabled" {
            Self::Enabled
        } else {
            Self::Disabled
        }
    }

    /// Returns the state as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Enabled => "enabled",
            Self::Disabled => "disabled",
        }
    }

    /// Returns true for [`FeatureState::Enabled`].
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled)
    }
}

/// A domain excepted from a feature's default behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExceptionEntry {
    /// Excepted domain, never empty.
    pub domain: String,
    /// Why the domain is excepted; empty when the payload omits it.
    pub reason: String,
}

impl ExceptionEntry {
    /// Creates a new exception entry.
    #[must_use]
    pub fn new(domain: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            reason: reason.into(),
        }
    }
}

/// Wire shape of a feature payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFeature {
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    min_supported_version: Option<i64>,
    #[serde(default)]
    exceptions: Option<Vec<RawException>>,
}

#[derive(Debug, Deserialize)]
struct RawException {
    domain: String,
    #[serde(default)]
    reason: Option<String>,
}

/// A feature payload parsed from the remote privacy configuration.
///
/// The default value is the fail-safe description: disabled, no version gate,
/// no exceptions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FeatureDescription {
    /// Published state.
    pub state: FeatureState,
    /// Lowest app version the toggle applies to.
    pub min_supported_version: Option<i64>,
    /// Exception list in payload order.
    pub exceptions: Vec<ExceptionEntry>,
}

impl FeatureDescription {
    /// Parses a feature payload.
    ///
    /// A missing or unrecognized `state` yields [`FeatureState::Disabled`].
    /// Exceptions with an empty domain are dropped; a missing `reason`
    /// becomes the empty string.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error when the payload is not JSON or does
    /// not have the feature shape (for example an exception without a
    /// `domain`).
    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(json)?;
        let raw: RawFeature = serde_json::from_value(require_feature_object(value)?)?;

        let exceptions = raw
            .exceptions
            .unwrap_or_default()
            .into_iter()
            .filter(|e| !e.domain.trim().is_empty())
            .map(|e| ExceptionEntry::new(e.domain, e.reason.unwrap_or_default()))
            .collect();

        Ok(Self {
            state: raw
                .state
                .as_deref()
                .map_or(FeatureState::Disabled, FeatureState::parse),
            min_supported_version: raw.min_supported_version,
            exceptions,
        })
    }

    /// Returns the fail-safe description used for corrupt payloads.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }
}

/// Rejects payloads and exception entries that are not JSON objects.
///
/// Derived struct deserialization also accepts positional arrays, which the
/// remote config never publishes.
fn require_feature_object(value: Value) -> std::result::Result<Value, serde_json::Error> {
    let Value::Object(map) = &value else {
        return Err(serde::de::Error::custom("feature payload must be a JSON object"));
    };
    if let Some(Value::Array(entries)) = map.get("exceptions")
        && entries.iter().any(|entry| !entry.is_object())
    {
        return Err(serde::de::Error::custom("exception entries must be JSON objects"));
    }
    Ok(value)
}

/// Persisted enabled/disabled flag with a minimum app version gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureToggle {
    /// Feature key (unique).
    pub feature_key: String,
    /// Whether the remote config enabled the feature.
    pub enabled: bool,
    /// Lowest app version the toggle applies to.
    pub min_supported_version: Option<i64>,
}

impl FeatureToggle {
    /// Builds the toggle record for a parsed feature payload.
    #[must_use]
    pub fn from_description(feature: PrivacyFeatureName, description: &FeatureDescription) -> Self {
        Self {
            feature_key: feature.as_str().to_string(),
            enabled: description.state.is_enabled(),
            min_supported_version: description.min_supported_version,
        }
    }

    /// Returns true if the feature is on for the given app version.
    ///
    /// Versions below `min_supported_version` always see the feature off.
    #[must_use]
    pub fn is_enabled_for(&self, app_version: i64) -> bool {
        self.enabled
            && self
                .min_supported_version
                .is_none_or(|min| app_version >= min)
    }
}
