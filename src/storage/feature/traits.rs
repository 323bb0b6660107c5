//! Feature storage trait definitions.
//!
//! Defines the toggle table (`feature_key -> {enabled, min_supported_version}`)
//! and the feature-scoped exception table, together with the scoped
//! transaction importers write through.

use crate::Result;
use crate::models::{ExceptionEntry, FeatureToggle};

/// Write operations available inside a [`FeatureStore::transaction`] scope.
///
/// Writes are only visible to readers once the enclosing transaction commits.
pub trait FeatureTransaction {
    /// Replaces every exception of `feature_key` with `exceptions`.
    ///
    /// Existing rows are deleted, not merged. Payload order is preserved.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be written.
    fn replace_exceptions(&self, feature_key: &str, exceptions: &[ExceptionEntry]) -> Result<()>;

    /// Inserts the toggle, or overwrites the existing row with the same key.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be written.
    fn upsert_toggle(&self, toggle: &FeatureToggle) -> Result<()>;
}

/// Trait for feature toggle and exception storage backends.
///
/// Implementations must be thread-safe (`Send + Sync`).
pub trait FeatureStore: Send + Sync {
    /// Runs `work` inside one atomic transaction.
    ///
    /// The transaction commits if `work` returns `Ok` and rolls back if it
    /// returns `Err` or panics. Concurrent transactions are serialized, so
    /// readers never see the exceptions of one payload next to the toggle of
    /// another.
    ///
    /// # Errors
    ///
    /// Returns the error from `work`, or a storage error if the transaction
    /// cannot be started or committed. Nothing is committed in either case.
    fn transaction(
        &self,
        work: &mut dyn FnMut(&dyn FeatureTransaction) -> Result<()>,
    ) -> Result<()>;

    /// Gets the toggle for a feature key.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be accessed.
    fn get_toggle(&self, feature_key: &str) -> Result<Option<FeatureToggle>>;

    /// Lists all toggles ordered by feature key.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be accessed.
    fn list_toggles(&self) -> Result<Vec<FeatureToggle>>;

    /// Lists the exceptions of a feature in payload order.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be accessed.
    fn list_exceptions(&self, feature_key: &str) -> Result<Vec<ExceptionEntry>>;
}
