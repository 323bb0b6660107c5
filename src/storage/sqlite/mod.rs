//! Shared `SQLite` infrastructure for storage backends.
//!
//! - [`connection`]: `Mutex<Connection>` lock acquisition with poison recovery
//!   and pragma configuration
//! - [`metrics`]: per-operation counters and latency histograms

mod connection;
mod metrics;

pub use connection::{acquire_lock, configure_connection};
pub use metrics::record_operation_metrics;
