//! Feature toggle and exception storage backends.
//!
//! # Tables
//!
//! - `privacy_feature_toggles`: one row per feature key
//! - `feature_exceptions`: the exception list of each feature, replaced
//!   wholesale on every import
//!
//! # Backend Selection
//!
//! `SQLite` is the default and stores both tables in
//! `{data_dir}/features.db`. The in-memory backend keeps nothing between runs.

mod memory;
mod sqlite;
mod traits;

pub use memory::InMemoryFeatureStore;
pub use sqlite::SqliteFeatureStore;
pub use traits::{FeatureStore, FeatureTransaction};

use crate::config::RemoteConfConfig;
use crate::{Error, Result};
use std::path::PathBuf;
use std::sync::Arc;

/// Backend type for feature storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeatureBackendType {
    /// `SQLite` database file (default).
    #[default]
    Sqlite,
    /// Process-local tables.
    Memory,
}

impl FeatureBackendType {
    /// Parses a backend name. Unknown names fall back to `SQLite`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "memory" | "in-memory" | "in_memory" => Self::Memory,
            _ => Self::Sqlite,
        }
    }
}

/// Factory for creating feature storage.
pub struct FeatureStoreFactory;

impl FeatureStoreFactory {
    /// Database file name inside the data directory.
    pub const DEFAULT_DB_FILE: &'static str = "features.db";

    /// Creates the backend selected by the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the `SQLite` database cannot be initialized.
    pub fn create(config: &RemoteConfConfig) -> Result<Arc<dyn FeatureStore>> {
        match config.storage_backend {
            FeatureBackendType::Memory => Ok(Self::create_in_memory()),
            FeatureBackendType::Sqlite => {
                let path = Self::resolve_db_path(config).ok_or_else(|| Error::OperationFailed {
                    operation: "create_feature_storage".to_string(),
                    cause: "Could not determine database path".to_string(),
                })?;
                tracing::debug!(path = %path.display(), "opening feature store");
                Self::create_with_path(path)
            },
        }
    }

    /// Creates a `SQLite` store with an explicit path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn create_with_path(path: PathBuf) -> Result<Arc<dyn FeatureStore>> {
        Ok(Arc::new(SqliteFeatureStore::new(path)?))
    }

    /// Creates an in-memory store.
    #[must_use]
    pub fn create_in_memory() -> Arc<dyn FeatureStore> {
        Arc::new(InMemoryFeatureStore::new())
    }

    /// Resolves the database path: explicit `database_path`, else
    /// `{data_dir}/features.db`.
    #[must_use]
    pub fn resolve_db_path(config: &RemoteConfConfig) -> Option<PathBuf> {
        config
            .database_path
            .clone()
            .or_else(|| Some(config.data_dir.join(Self::DEFAULT_DB_FILE)))
            .filter(|p| !p.as_os_str().is_empty())
    }
}
