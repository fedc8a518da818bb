//! Operation metrics for `SQLite` record stores.

use std::time::Instant;

/// Records count and latency of one driver operation.
///
/// Emits `storage_operations_total` (counter) and
/// `storage_operation_duration_ms` (histogram), labelled by backend, storage
/// mode (`blob` or `hybrid`), operation and status (`success` or `error`).
///
/// # Examples
///
/// ```ignore
/// use std::time::Instant;
/// use recordstore::storage::sqlite::record_operation_metrics;
///
/// let start = Instant::now();
/// // ... perform operation ...
/// record_operation_metrics("hybrid", "insert", start, "success");
/// ```
pub fn record_operation_metrics(
    mode: &'static str,
    operation: &'static str,
    start: Instant,
    status: &'static str,
) {
    metrics::counter!(
        "storage_operations_total",
        "backend" => "sqlite",
        "mode" => mode,
        "operation" => operation,
        "status" => status
    )
    .increment(1);
    metrics::histogram!(
        "storage_operation_duration_ms",
        "backend" => "sqlite",
        "mode" => mode,
        "operation" => operation,
        "status" => status
    )
    .record(start.elapsed().as_secs_f64() * 1000.0);
}

/// Records how many rows a multi-row operation touched.
#[allow(clippy::cast_precision_loss)]
pub fn record_rows_affected(mode: &'static str, operation: &'static str, rows: usize) {
    metrics::histogram!(
        "storage_rows_affected",
        "backend" => "sqlite",
        "mode" => mode,
        "operation" => operation
    )
    .record(rows as f64);
}
