//! In-memory feature backend.
//!
//! Non-persistent implementation of [`FeatureStore`] for tests and for
//! running the CLI without a database file.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use crate::Result;
use crate::models::{ExceptionEntry, FeatureToggle};
use crate::storage::sqlite::acquire_lock;

use super::traits::{FeatureStore, FeatureTransaction};

#[derive(Debug, Clone, Default)]
struct Tables {
    toggles: BTreeMap<String, FeatureToggle>,
    exceptions: HashMap<String, Vec<ExceptionEntry>>,
}

/// In-memory feature storage.
///
/// A transaction works on a copy of the tables and swaps it in on success,
/// so a failed or panicking transaction leaves the committed tables intact.
#[derive(Debug, Default)]
pub struct InMemoryFeatureStore {
    tables: Mutex<Tables>,
}

impl InMemoryFeatureStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

struct StagedTransaction {
    staged: RefCell<Tables>,
}

impl FeatureTransaction for StagedTransaction {
    fn replace_exceptions(&self, feature_key: &str, exceptions: &[ExceptionEntry]) -> Result<()> {
        self.staged
            .borrow_mut()
            .exceptions
            .insert(feature_key.to_string(), exceptions.to_vec());
        Ok(())
    }

    fn upsert_toggle(&self, toggle: &FeatureToggle) -> Result<()> {
        self.staged
            .borrow_mut()
            .toggles
            .insert(toggle.feature_key.clone(), toggle.clone());
        Ok(())
    }
}

impl FeatureStore for InMemoryFeatureStore {
    fn transaction(
        &self,
        work: &mut dyn FnMut(&dyn FeatureTransaction) -> Result<()>,
    ) -> Result<()> {
        let mut tables = acquire_lock(&self.tables);
        let tx = StagedTransaction {
            staged: RefCell::new(tables.clone()),
        };

        work(&tx)?;

        *tables = tx.staged.into_inner();
        Ok(())
    }

    fn get_toggle(&self, feature_key: &str) -> Result<Option<FeatureToggle>> {
        Ok(acquire_lock(&self.tables).toggles.get(feature_key).cloned())
    }

    fn list_toggles(&self) -> Result<Vec<FeatureToggle>> {
        Ok(acquire_lock(&self.tables).toggles.values().cloned().collect())
    }

    fn list_exceptions(&self, feature_key: &str) -> Result<Vec<ExceptionEntry>> {
        Ok(acquire_lock(&self.tables)
            .exceptions
            .get(feature_key)
            .cloned()
            .unwrap_or_default())
    }
}
