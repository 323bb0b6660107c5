//! Shared connection handling for `SQLite` backends.

use crate::Result;
use rusqlite::Connection;
use std::sync::{Mutex, MutexGuard};

/// Acquires a mutex lock, recovering the inner value if the mutex is poisoned.
///
/// A panic inside a transaction scope drops the `rusqlite::Transaction`
/// (rolling it back) before the guard is released, so the connection is
/// still consistent when the poison is cleared.
pub fn acquire_lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("SQLite mutex was poisoned, recovering");
            metrics::counter!("sqlite_mutex_poison_recovery_total").increment(1);
            poisoned.into_inner()
        },
    }
}

/// Configures a `SQLite` connection for concurrent readers and a single writer.
///
/// - **WAL mode**: readers never block on the writer
/// - **NORMAL synchronous**: fsync at checkpoints only
/// - **`busy_timeout`**: wait up to 5 seconds on lock contention
///
/// # Errors
///
/// Currently infallible; pragma failures are ignored because in-memory
/// databases reject WAL.
pub fn configure_connection(conn: &Connection) -> Result<()> {
    // journal_mode returns a row, so pragma_update is used instead of execute_batch
    let _ = conn.pragma_update(None, "journal_mode", "WAL");
    let _ = conn.pragma_update(None, "synchronous", "NORMAL");
    let _ = conn.pragma_update(None, "busy_timeout", "5000");

    Ok(())
}
