//! Shared metrics recording for `SQLite` backends.

use std::time::Instant;

/// Records `storage_operations_total` and `storage_operation_duration_ms`
/// for one storage operation.
///
/// `status` is `"success"` or `"error"`.
pub fn record_operation_metrics(
    backend: &'static str,
    operation: &'static str,
    start: Instant,
    status: &'static str,
) {
    metrics::counter!(
        "storage_operations_total",
        "backend" => backend,
        "operation" => operation,
        "status" => status
    )
    .increment(1);
    metrics::histogram!(
        "storage_operation_duration_ms",
        "backend" => backend,
        "operation" => operation,
        "status" => status
    )
    .record(start.elapsed().as_secs_f64() * 1000.0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusBuilder;

    #[test]
    fn test_operation_counter_carries_labels() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            let start = Instant::now();
            record_operation_metrics("sqlite_features", "transaction", start, "success");
            record_operation_metrics("sqlite_features", "get_toggle", start, "error");
        });

        let rendered = handle.render();
        let counters: Vec<_> = rendered
            .lines()
            .filter(|line| line.starts_with("storage_operations_total{"))
            .collect();
        assert_eq!(counters.len(), 2, "{rendered}");
        assert!(counters.iter().all(|line| line.contains("backend=\"sqlite_features\"")));
        assert!(counters.iter().any(|line| {
            line.contains("operation=\"transaction\"") && line.contains("status=\"success\"")
        }));
        assert!(counters.iter().any(|line| {
            line.contains("operation=\"get_toggle\"") && line.contains("status=\"error\"")
        }));
        assert!(rendered.contains("storage_operation_duration_ms"));
    }
}
