//! Device locale attribute (`locale`).

use std::sync::Arc;

use async_trait::async_trait;

use crate::Result;
use crate::models::{JsonMatchingAttribute, LOCALE_KEY, MatchingAttribute};

use super::state::LocaleProvider;
use super::traits::{AttributeMatcherPlugin, JsonToMatchingAttributeMapper};

/// Owns the `locale` key and [`MatchingAttribute::Locale`].
pub struct LocalePlugin {
    locale: Arc<dyn LocaleProvider>,
}

impl LocalePlugin {
    /// Creates the plugin over a locale provider.
    #[must_use]
    pub fn new(locale: Arc<dyn LocaleProvider>) -> Self {
        Self { locale }
    }
}

/// Normalizes a locale tag: lowercase, `_` read as `-`.
fn normalize(tag: &str) -> String {
    tag.trim().replace('_', "-").to_lowercase()
}

impl JsonToMatchingAttributeMapper for LocalePlugin {
    fn map(&self, key: &str, json: &JsonMatchingAttribute) -> Result<Option<MatchingAttribute>> {
        if key != LOCALE_KEY {
            return Ok(None);
        }
        Ok(Some(MatchingAttribute::Locale {
            values: json.as_string_list(key)?,
        }))
    }
}

#[async_trait]
impl AttributeMatcherPlugin for LocalePlugin {
    async fn evaluate(&self, attribute: &MatchingAttribute) -> Result<Option<bool>> {
        let MatchingAttribute::Locale { values } = attribute else {
            return Ok(None);
        };
        let current = normalize(&self.locale.locale().await?);
        Ok(Some(values.iter().any(|v| normalize(v) == current)))
    }
}
