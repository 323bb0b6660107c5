//! Live application state consulted during evaluation.

use async_trait::async_trait;

use crate::Result;

/// VPN (network protection) onboarding state.
#[async_trait]
pub trait NetworkProtectionState: Send + Sync {
    /// Returns whether the user has completed VPN onboarding.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::StateUnavailable`] if the state cannot be read.
    async fn is_onboarded(&self) -> Result<bool>;
}

/// Build information of the running app.
#[async_trait]
pub trait AppBuildConfig: Send + Sync {
    /// Returns the numeric app version code.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::StateUnavailable`] if the build info cannot be
    /// read.
    async fn version_code(&self) -> Result<i64>;
}

/// Device locale.
#[async_trait]
pub trait LocaleProvider: Send + Sync {
    /// Returns the current locale tag, for example `en-US`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::StateUnavailable`] if the locale cannot be read.
    async fn locale(&self) -> Result<String>;
}

/// Fixed device state, used by the CLI and in tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticDeviceState {
    /// VPN onboarding state.
    pub onboarded: bool,
    /// App version code.
    pub version_code: i64,
    /// Locale tag.
    pub locale: String,
}

#[async_trait]
impl NetworkProtectionState for StaticDeviceState {
    async fn is_onboarded(&self) -> Result<bool> {
        Ok(self.onboarded)
    }
}

#[async_trait]
impl AppBuildConfig for StaticDeviceState {
    async fn version_code(&self) -> Result<i64> {
        Ok(self.version_code)
    }
}

#[async_trait]
impl LocaleProvider for StaticDeviceState {
    async fn locale(&self) -> Result<String> {
        Ok(self.locale.clone())
    }
}
