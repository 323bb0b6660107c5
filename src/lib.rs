//! # Remoteconf
//!
//! Remote feature-configuration ingestion and remote-message attribute matching.
//!
//! Remoteconf takes the JSON feature payloads published by a remote privacy
//! configuration, persists each feature's exception list and versioned toggle,
//! and maps remote-messaging targeting attributes into typed predicates that
//! are evaluated against live application state.
//!
//! ## Features
//!
//! - Ordered importer registry with "first claim wins" dispatch
//! - Atomic exception-replace + toggle-upsert per feature (`SQLite` or in-memory)
//! - Fail-safe parsing: a corrupt payload disables its feature
//! - Closed set of matching attributes with tri-state evaluation
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use remoteconf::privacy::{ExceptionListPlugin, PrivacyFeatureRegistry};
//! use remoteconf::storage::FeatureStoreFactory;
//!
//! let store = FeatureStoreFactory::create_in_memory();
//! let registry = PrivacyFeatureRegistry::builder()
//!     .with(ExceptionListPlugin::drm(Arc::clone(&store)))
//!     .build();
//!
//! let claimed = registry.dispatch("drm", r#"{"state":"enabled"}"#)?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod config;
pub mod models;
pub mod observability;
pub mod privacy;
pub mod rmf;
pub mod storage;

// Re-exports for convenience
pub use config::RemoteConfConfig;
pub use models::{
    ExceptionEntry, FeatureDescription, FeatureState, FeatureToggle, JsonMatchingAttribute,
    MatchingAttribute, PrivacyFeatureName,
};
pub use privacy::{ExceptionListPlugin, FeatureGate, PrivacyFeaturePlugin, PrivacyFeatureRegistry};
pub use rmf::{AttributeMatcherPlugin, JsonToMatchingAttributeMapper, MatchingAttributeRegistry};
pub use storage::{FeatureStore, FeatureTransaction};

/// Error type for remoteconf operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Unknown feature names on the CLI, unreadable input documents |
/// | `OperationFailed` | `SQLite` errors, transaction commit failures, I/O errors |
/// | `TypeMismatch` | A recognized matching attribute carries a value of the wrong type |
/// | `StateUnavailable` | A live-state provider fails while evaluating an attribute |
///
/// Unrecognized features and attribute keys are not errors: importers return
/// `false` and plugins return `None` so dispatch can continue.
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    ///
    /// Raised when:
    /// - `SQLite` statements or transactions fail
    /// - Filesystem I/O errors occur while reading config or payloads
    /// - Observability cannot be initialized
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// A matching attribute value could not be coerced to its declared type.
    ///
    /// The remote config source violated the attribute contract. Batch
    /// mapping logs and skips the attribute; single mapping surfaces it.
    #[error("matching attribute '{key}' expected {expected}")]
    TypeMismatch {
        /// The attribute key.
        key: String,
        /// Description of the expected JSON type.
        expected: &'static str,
    },

    /// A live-state provider could not answer.
    #[error("state provider '{provider}' unavailable: {cause}")]
    StateUnavailable {
        /// Name of the provider.
        provider: &'static str,
        /// The underlying cause.
        cause: String,
    },
}

/// Result type alias for remoteconf operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Returns the current Unix timestamp in seconds.
///
/// Falls back to 0 if the system clock is before the Unix epoch.
#[must_use]
pub fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
