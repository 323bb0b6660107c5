//! `SQLite` backend for feature toggles and exceptions.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use tracing::instrument;

use crate::models::{ExceptionEntry, FeatureToggle};
use crate::storage::sqlite::{acquire_lock, configure_connection, record_operation_metrics};
use crate::{Error, Result, current_timestamp};

use super::traits::{FeatureStore, FeatureTransaction};

const BACKEND: &str = "sqlite_features";

/// SQLite-based feature storage backend.
///
/// # Concurrency Model
///
/// All access goes through one `Mutex<Connection>`, so transactions are
/// serialized in-process. Transactions use `BEGIN IMMEDIATE` so a second
/// process writing the same file waits on `busy_timeout` instead of failing
/// at commit.
pub struct SqliteFeatureStore {
    /// Connection to the `SQLite` database.
    conn: Mutex<Connection>,
    /// Path to the `SQLite` database (None for in-memory).
    db_path: Option<PathBuf>,
}

impl SqliteFeatureStore {
    /// Opens (or creates) a feature store at the specified path.
    ///
    /// Missing parent directories are created.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| Error::OperationFailed {
                operation: "create_feature_db_dir".to_string(),
                cause: e.to_string(),
            })?;
        }

        let conn = Connection::open(path).map_err(|e| Error::OperationFailed {
            operation: "open_feature_database".to_string(),
            cause: e.to_string(),
        })?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path: Some(path.to_path_buf()),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Creates an in-memory feature store (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| Error::OperationFailed {
            operation: "open_feature_database_memory".to_string(),
            cause: e.to_string(),
        })?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path: None,
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Returns the database path (None for in-memory).
    #[must_use]
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Initializes the database schema.
    fn initialize_schema(&self) -> Result<()> {
        let conn = acquire_lock(&self.conn);
        configure_connection(&conn)?;

        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS privacy_feature_toggles (
                feature_key TEXT PRIMARY KEY,
                enabled INTEGER NOT NULL,
                min_supported_version INTEGER,
                updated_at INTEGER NOT NULL
            );

            -- position keeps payload order; duplicates in a payload are kept as-is
            CREATE TABLE IF NOT EXISTS feature_exceptions (
                feature_key TEXT NOT NULL,
                position INTEGER NOT NULL,
                domain TEXT NOT NULL,
                reason TEXT NOT NULL DEFAULT '',
                PRIMARY KEY (feature_key, position)
            );

            CREATE INDEX IF NOT EXISTS idx_feature_exceptions_domain
                ON feature_exceptions(feature_key, domain);
            ",
        )
        .map_err(|e| Error::OperationFailed {
            operation: "initialize_feature_schema".to_string(),
            cause: e.to_string(),
        })?;

        Ok(())
    }

    fn run_transaction(
        &self,
        work: &mut dyn FnMut(&dyn FeatureTransaction) -> Result<()>,
    ) -> Result<()> {
        let mut conn = acquire_lock(&self.conn);

        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| Error::OperationFailed {
                operation: "begin_transaction".to_string(),
                cause: e.to_string(),
            })?;

        // Dropping `tx` on the error path rolls back
        work(&SqliteFeatureTransaction { conn: &tx })?;

        tx.commit().map_err(|e| Error::OperationFailed {
            operation: "commit_transaction".to_string(),
            cause: e.to_string(),
        })
    }

    fn query_toggles(&self) -> Result<Vec<FeatureToggle>> {
        let conn = acquire_lock(&self.conn);

        let mut stmt = conn
            .prepare(
                "SELECT feature_key, enabled, min_supported_version
                 FROM privacy_feature_toggles ORDER BY feature_key",
            )
            .map_err(|e| Error::OperationFailed {
                operation: "prepare_list_toggles".to_string(),
                cause: e.to_string(),
            })?;

        stmt.query_map([], Self::read_toggle)
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(|e| Error::OperationFailed {
                operation: "list_toggles".to_string(),
                cause: e.to_string(),
            })
    }

    fn query_exceptions(&self, feature_key: &str) -> Result<Vec<ExceptionEntry>> {
        let conn = acquire_lock(&self.conn);

        let mut stmt = conn
            .prepare(
                "SELECT domain, reason FROM feature_exceptions
                 WHERE feature_key = ?1 ORDER BY position",
            )
            .map_err(|e| Error::OperationFailed {
                operation: "prepare_list_exceptions".to_string(),
                cause: e.to_string(),
            })?;

        stmt.query_map(params![feature_key], |row| {
            Ok(ExceptionEntry {
                domain: row.get(0)?,
                reason: row.get(1)?,
            })
        })
        .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
        .map_err(|e| Error::OperationFailed {
            operation: "list_exceptions".to_string(),
            cause: e.to_string(),
        })
    }

    fn read_toggle(row: &rusqlite::Row<'_>) -> rusqlite::Result<FeatureToggle> {
        Ok(FeatureToggle {
            feature_key: row.get(0)?,
            enabled: row.get(1)?,
            min_supported_version: row.get(2)?,
        })
    }
}

/// Statements executed inside an open `rusqlite::Transaction`.
struct SqliteFeatureTransaction<'a> {
    conn: &'a Connection,
}

impl FeatureTransaction for SqliteFeatureTransaction<'_> {
    fn replace_exceptions(&self, feature_key: &str, exceptions: &[ExceptionEntry]) -> Result<()> {
        self.conn
            .execute(
                "DELETE FROM feature_exceptions WHERE feature_key = ?1",
                params![feature_key],
            )
            .map_err(|e| Error::OperationFailed {
                operation: "delete_exceptions".to_string(),
                cause: e.to_string(),
            })?;

        let mut stmt = self
            .conn
            .prepare_cached(
                "INSERT INTO feature_exceptions (feature_key, position, domain, reason)
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .map_err(|e| Error::OperationFailed {
                operation: "prepare_insert_exception".to_string(),
                cause: e.to_string(),
            })?;

        for (position, exception) in exceptions.iter().enumerate() {
            #[allow(clippy::cast_possible_wrap)]
            let position = position as i64;
            stmt.execute(params![
                feature_key,
                position,
                exception.domain,
                exception.reason
            ])
            .map_err(|e| Error::OperationFailed {
                operation: "insert_exception".to_string(),
                cause: e.to_string(),
            })?;
        }

        Ok(())
    }

    fn upsert_toggle(&self, toggle: &FeatureToggle) -> Result<()> {
        #[allow(clippy::cast_possible_wrap)]
        let now = current_timestamp() as i64;

        self.conn
            .execute(
                "INSERT INTO privacy_feature_toggles
                    (feature_key, enabled, min_supported_version, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(feature_key) DO UPDATE SET
                    enabled = excluded.enabled,
                    min_supported_version = excluded.min_supported_version,
                    updated_at = excluded.updated_at",
                params![
                    toggle.feature_key,
                    toggle.enabled,
                    toggle.min_supported_version,
                    now
                ],
            )
            .map_err(|e| Error::OperationFailed {
                operation: "upsert_toggle".to_string(),
                cause: e.to_string(),
            })?;

        Ok(())
    }
}

impl FeatureStore for SqliteFeatureStore {
    #[instrument(skip_all, fields(operation = "transaction", backend = BACKEND))]
    fn transaction(
        &self,
        work: &mut dyn FnMut(&dyn FeatureTransaction) -> Result<()>,
    ) -> Result<()> {
        let start = Instant::now();
        let result = self.run_transaction(work);

        let status = if result.is_ok() { "success" } else { "error" };
        record_operation_metrics(BACKEND, "transaction", start, status);
        result
    }

    #[instrument(skip(self), fields(operation = "get_toggle", backend = BACKEND))]
    fn get_toggle(&self, feature_key: &str) -> Result<Option<FeatureToggle>> {
        let start = Instant::now();
        let result = {
            let conn = acquire_lock(&self.conn);
            conn.query_row(
                "SELECT feature_key, enabled, min_supported_version
                 FROM privacy_feature_toggles WHERE feature_key = ?1",
                params![feature_key],
                Self::read_toggle,
            )
            .optional()
            .map_err(|e| Error::OperationFailed {
                operation: "get_toggle".to_string(),
                cause: e.to_string(),
            })
        };

        let status = if result.is_ok() { "success" } else { "error" };
        record_operation_metrics(BACKEND, "get_toggle", start, status);
        result
    }

    #[instrument(skip(self), fields(operation = "list_toggles", backend = BACKEND))]
    fn list_toggles(&self) -> Result<Vec<FeatureToggle>> {
        let start = Instant::now();
        let result = self.query_toggles();

        let status = if result.is_ok() { "success" } else { "error" };
        record_operation_metrics(BACKEND, "list_toggles", start, status);
        result
    }

    #[instrument(skip(self), fields(operation = "list_exceptions", backend = BACKEND))]
    fn list_exceptions(&self, feature_key: &str) -> Result<Vec<ExceptionEntry>> {
        let start = Instant::now();
        let result = self.query_exceptions(feature_key);

        let status = if result.is_ok() { "success" } else { "error" };
        record_operation_metrics(BACKEND, "list_exceptions", start, status);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toggle(key: &str, enabled: bool, min: Option<i64>) -> FeatureToggle {
        FeatureToggle {
            feature_key: key.to_string(),
            enabled,
            min_supported_version: min,
        }
    }

    #[test]
    fn test_upsert_and_get_toggle() {
        let store = SqliteFeatureStore::in_memory().unwrap();

        store
            .transaction(&mut |tx| tx.upsert_toggle(&toggle("drm", true, Some(5))))
            .unwrap();
        assert_eq!(
            store.get_toggle("drm").unwrap(),
            Some(toggle("drm", true, Some(5)))
        );

        store
            .transaction(&mut |tx| tx.upsert_toggle(&toggle("drm", false, None)))
            .unwrap();
        assert_eq!(
            store.get_toggle("drm").unwrap(),
            Some(toggle("drm", false, None))
        );
        assert_eq!(store.list_toggles().unwrap().len(), 1);
    }

    #[test]
    fn test_get_missing_toggle() {
        let store = SqliteFeatureStore::in_memory().unwrap();
        assert_eq!(store.get_toggle("gpc").unwrap(), None);
    }

    #[test]
    fn test_replace_exceptions_is_not_a_merge() {
        let store = SqliteFeatureStore::in_memory().unwrap();
        let first = vec![
            ExceptionEntry::new("a.com", "one"),
            ExceptionEntry::new("b.com", ""),
        ];
        let second = vec![ExceptionEntry::new("c.com", "three")];

        store
            .transaction(&mut |tx| tx.replace_exceptions("drm", &first))
            .unwrap();
        assert_eq!(store.list_exceptions("drm").unwrap(), first);

        store
            .transaction(&mut |tx| tx.replace_exceptions("drm", &second))
            .unwrap();
        assert_eq!(store.list_exceptions("drm").unwrap(), second);
    }

    #[test]
    fn test_exceptions_are_feature_scoped() {
        let store = SqliteFeatureStore::in_memory().unwrap();
        let drm = vec![ExceptionEntry::new("a.com", "")];
        let gpc = vec![ExceptionEntry::new("b.com", "")];

        store
            .transaction(&mut |tx| {
                tx.replace_exceptions("drm", &drm)?;
                tx.replace_exceptions("gpc", &gpc)
            })
            .unwrap();

        store
            .transaction(&mut |tx| tx.replace_exceptions("drm", &[]))
            .unwrap();

        assert!(store.list_exceptions("drm").unwrap().is_empty());
        assert_eq!(store.list_exceptions("gpc").unwrap(), gpc);
    }

    #[test]
    fn test_failed_transaction_rolls_back() {
        let store = SqliteFeatureStore::in_memory().unwrap();
        let committed = vec![ExceptionEntry::new("keep.com", "")];

        store
            .transaction(&mut |tx| {
                tx.replace_exceptions("drm", &committed)?;
                tx.upsert_toggle(&toggle("drm", true, None))
            })
            .unwrap();

        let result = store.transaction(&mut |tx| {
            tx.replace_exceptions("drm", &[ExceptionEntry::new("new.com", "")])?;
            Err(Error::OperationFailed {
                operation: "test".to_string(),
                cause: "abort".to_string(),
            })
        });

        assert!(result.is_err());
        assert_eq!(store.list_exceptions("drm").unwrap(), committed);
        assert_eq!(
            store.get_toggle("drm").unwrap(),
            Some(toggle("drm", true, None))
        );
    }

    #[test]
    fn test_store_is_usable_after_panic_in_transaction() {
        let store = std::sync::Arc::new(SqliteFeatureStore::in_memory().unwrap());
        let panicking = std::sync::Arc::clone(&store);

        let _ = std::thread::spawn(move || {
            let _ = panicking.transaction(&mut |tx| {
                tx.upsert_toggle(&toggle("drm", true, None))?;
                panic!("boom");
            });
        })
        .join();

        assert_eq!(store.get_toggle("drm").unwrap(), None);
        store
            .transaction(&mut |tx| tx.upsert_toggle(&toggle("drm", false, None)))
            .unwrap();
        assert_eq!(
            store.get_toggle("drm").unwrap(),
            Some(toggle("drm", false, None))
        );
    }

    #[test]
    fn test_every_operation_records_metrics() {
        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let store = SqliteFeatureStore::in_memory().unwrap();

        metrics::with_local_recorder(&recorder, || {
            store
                .transaction(&mut |tx| tx.upsert_toggle(&toggle("drm", true, None)))
                .unwrap();
            store.get_toggle("drm").unwrap();
            store.list_toggles().unwrap();
            store.list_exceptions("drm").unwrap();
        });

        let rendered = handle.render();
        for operation in ["transaction", "get_toggle", "list_toggles", "list_exceptions"] {
            assert!(
                rendered.contains(&format!("operation=\"{operation}\"")),
                "missing {operation} in {rendered}"
            );
        }
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::TempDir::new().expect("failed to create temp dir");
        let db_path = dir.path().join("nested").join("features.db");

        {
            let store = SqliteFeatureStore::new(&db_path).unwrap();
            store
                .transaction(&mut |tx| {
                    tx.replace_exceptions("drm", &[ExceptionEntry::new("a.com", "r")])?;
                    tx.upsert_toggle(&toggle("drm", true, Some(3)))
                })
                .unwrap();
            assert_eq!(store.db_path(), Some(db_path.as_path()));
        }

        let reopened = SqliteFeatureStore::new(&db_path).unwrap();
        assert_eq!(
            reopened.get_toggle("drm").unwrap(),
            Some(toggle("drm", true, Some(3)))
        );
        assert_eq!(reopened.list_exceptions("drm").unwrap().len(), 1);
    }
}
