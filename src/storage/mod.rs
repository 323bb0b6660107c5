//! Storage layer abstraction.
//!
//! Feature toggles and exception lists are persisted through the
//! [`FeatureStore`] trait. Importers write through
//! [`FeatureStore::transaction`] so the exception replace and toggle upsert of
//! one payload commit together.

// Dropping the connection guard slightly early gains nothing.
#![allow(clippy::significant_drop_tightening)]

pub mod feature;
pub mod sqlite;

pub use feature::{
    FeatureBackendType, FeatureStore, FeatureStoreFactory, FeatureTransaction,
    InMemoryFeatureStore, SqliteFeatureStore,
};
