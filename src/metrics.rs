//! Run metrics for the cleaning pipeline and mart builders
//!
//! Recording goes through the `metrics` facade. Nothing is exported unless the
//! embedding process installs a recorder, so these calls are free in tests.

/// Metrics for the Schema Normalizer phase
pub struct NormalizeMetrics;

impl NormalizeMetrics {
    pub fn record_rows_read(rows: usize) {
        ::metrics::counter!("game_marts_normalize_rows_read_total").increment(rows as u64);
    }

    pub fn record_rows_kept(rows: usize) {
        ::metrics::counter!("game_marts_normalize_rows_kept_total").increment(rows as u64);
    }

    /// Record dropped rows under a reason label (missing_name, invalid_price, malformed)
    pub fn record_rows_dropped(reason: &'static str, rows: usize) {
        if rows == 0 {
            return;
        }
        ::metrics::counter!("game_marts_normalize_rows_dropped_total", "reason" => reason)
            .increment(rows as u64);
    }
}

/// Metrics for mart construction and persistence
pub struct MartMetrics;

impl MartMetrics {
    pub fn record_build(mart: &'static str, rows: usize, duration_secs: f64) {
        ::metrics::counter!("game_marts_tables_built_total", "mart" => mart).increment(1);
        ::metrics::histogram!("game_marts_build_duration_seconds", "mart" => mart)
            .record(duration_secs);
        ::metrics::histogram!("game_marts_rows_per_table", "mart" => mart).record(rows as f64);
    }

    pub fn record_write(bytes: usize) {
        ::metrics::counter!("game_marts_tables_written_total").increment(1);
        ::metrics::counter!("game_marts_bytes_written_total").increment(bytes as u64);
    }

    /// Destination was locked and the timestamped fallback was used
    pub fn record_fallback_write() {
        ::metrics::counter!("game_marts_fallback_writes_total").increment(1);
    }
}
