//! App version range attribute (`appVersion`).

use std::sync::Arc;

use async_trait::async_trait;

use crate::Result;
use crate::models::{APP_VERSION_KEY, JsonMatchingAttribute, MatchingAttribute};

use super::state::AppBuildConfig;
use super::traits::{AttributeMatcherPlugin, JsonToMatchingAttributeMapper};

/// Owns the `appVersion` key and [`MatchingAttribute::AppVersion`].
pub struct AppVersionPlugin {
    build: Arc<dyn AppBuildConfig>,
}

impl AppVersionPlugin {
    /// Creates the plugin over a build info provider.
    #[must_use]
    pub fn new(build: Arc<dyn AppBuildConfig>) -> Self {
        Self { build }
    }
}

impl JsonToMatchingAttributeMapper for AppVersionPlugin {
    fn map(&self, key: &str, json: &JsonMatchingAttribute) -> Result<Option<MatchingAttribute>> {
        if key != APP_VERSION_KEY {
            return Ok(None);
        }
        let (min, max) = json.as_int_range(key)?;
        Ok(Some(MatchingAttribute::AppVersion { min, max }))
    }
}

#[async_trait]
impl AttributeMatcherPlugin for AppVersionPlugin {
    async fn evaluate(&self, attribute: &MatchingAttribute) -> Result<Option<bool>> {
        let MatchingAttribute::AppVersion { min, max } = attribute else {
            return Ok(None);
        };
        let version = self.build.version_code().await?;
        Ok(Some(
            min.is_none_or(|min| version >= min) && max.is_none_or(|max| version <= max),
        ))
    }
}
