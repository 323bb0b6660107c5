//! Matching attribute plugin traits.

use async_trait::async_trait;

use crate::Result;
use crate::models::{JsonMatchingAttribute, MatchingAttribute};

/// Maps a raw remote-message attribute to a typed [`MatchingAttribute`].
pub trait JsonToMatchingAttributeMapper: Send + Sync {
    /// Maps `json` if `key` is owned by this mapper.
    ///
    /// Returns `Ok(None)` for keys owned by someone else.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::TypeMismatch`] when the key is owned but the
    /// value has the wrong JSON type.
    fn map(&self, key: &str, json: &JsonMatchingAttribute) -> Result<Option<MatchingAttribute>>;
}

/// Evaluates typed attributes against live application state.
#[async_trait]
pub trait AttributeMatcherPlugin: Send + Sync {
    /// Evaluates `attribute`.
    ///
    /// Returns `Ok(None)` for variants this plugin does not own, without
    /// touching any state provider. For owned variants the provider is
    /// queried exactly once.
    ///
    /// # Errors
    ///
    /// Returns the state provider's error unchanged.
    async fn evaluate(&self, attribute: &MatchingAttribute) -> Result<Option<bool>>;
}

/// A plugin that both maps and evaluates the attributes it owns.
pub trait MatchingAttributePlugin: JsonToMatchingAttributeMapper + AttributeMatcherPlugin {}

impl<T> MatchingAttributePlugin for T where T: JsonToMatchingAttributeMapper + AttributeMatcherPlugin {}
