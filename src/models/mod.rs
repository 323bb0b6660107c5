//! Data models for remoteconf.
//!
//! Privacy feature payloads and toggles live in [`feature`]; remote-messaging
//! matching attributes live in [`attribute`].

pub mod attribute;
mod feature;

pub use attribute::{
    APP_VERSION_KEY, JsonMatchingAttribute, LOCALE_KEY, MatchingAttribute, VPN_ONBOARDED_KEY,
};
pub use feature::{
    ExceptionEntry, FeatureDescription, FeatureState, FeatureToggle, PrivacyFeatureName,
};
