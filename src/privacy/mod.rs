//! Remote privacy configuration import.
//!
//! The remote privacy configuration publishes one JSON payload per feature.
//! A [`PrivacyFeatureRegistry`] offers each payload to its importers in
//! order; the owning [`PrivacyFeaturePlugin`] persists the feature's
//! exception list and toggle in one transaction. [`FeatureGate`] reads the
//! result back.

mod gate;
mod plugin;
mod registry;

pub use gate::{FeatureGate, same_or_subdomain};
pub use plugin::{ExceptionListPlugin, PrivacyFeaturePlugin, parse_feature_or_disabled};
pub use registry::{IngestReport, PrivacyFeatureRegistry, PrivacyFeatureRegistryBuilder};
