//! Remote-messaging matching attributes.
//!
//! Remote messages carry targeting rules keyed by attribute name. Each
//! plugin owns one key: it maps the raw JSON value to a typed
//! [`MatchingAttribute`](crate::models::MatchingAttribute) and later
//! evaluates that attribute against live state. Evaluation is tri-state:
//! `Some(true)`/`Some(false)` from the owning plugin, `None` from everyone
//! else.
//!
//! | Key | Plugin | State |
//! |-----|--------|-------|
//! | `netpOnboarded` | [`VpnOnboardedPlugin`] | [`NetworkProtectionState`] |
//! | `appVersion` | [`AppVersionPlugin`] | [`AppBuildConfig`] |
//! | `locale` | [`LocalePlugin`] | [`LocaleProvider`] |

mod app_version;
mod locale;
mod registry;
mod state;
mod traits;
mod vpn;

pub use app_version::AppVersionPlugin;
pub use locale::LocalePlugin;
pub use registry::{MappedAttributes, MatchingAttributeRegistry, MatchingAttributeRegistryBuilder};
pub use state::{AppBuildConfig, LocaleProvider, NetworkProtectionState, StaticDeviceState};
pub use traits::{AttributeMatcherPlugin, JsonToMatchingAttributeMapper, MatchingAttributePlugin};
pub use vpn::VpnOnboardedPlugin;
