// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation.
//!
//! Uses the `metrics` crate for backend-agnostic collection; the host picks
//! the exporter.
//!
//! # Metric Naming Convention
//! - `cloud_search_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `index`: remote index name
//! - `terminal`: rows, count, any, first, single, element_at, facets
//! - `status`: success, error, short_circuit

use metrics::{counter, gauge, histogram};
use std::time::{Duration, Instant};

/// Record one query execution
pub fn record_query(index: &str, terminal: &'static str, status: &'static str) {
    counter!(
        "cloud_search_queries_total",
        "index" => index.to_string(),
        "terminal" => terminal,
        "status" => status
    )
    .increment(1);
}

/// Record query round-trip latency
pub fn record_query_latency(index: &str, duration: Duration) {
    histogram!(
        "cloud_search_query_seconds",
        "index" => index.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Record rows returned by one page
pub fn record_rows_returned(index: &str, rows: usize) {
    histogram!(
        "cloud_search_rows_returned",
        "index" => index.to_string()
    )
    .record(rows as f64);
}

/// Record one posted batch
pub fn record_batch_posted(index: &str, documents: usize, success: bool) {
    let status = if success { "success" } else { "error" };
    counter!(
        "cloud_search_commit_batches_total",
        "index" => index.to_string(),
        "status" => status
    )
    .increment(1);
    if success {
        counter!(
            "cloud_search_documents_committed_total",
            "index" => index.to_string()
        )
        .increment(documents as u64);
    }
}

/// Record documents returned to pending after a failed flush
pub fn record_documents_requeued(index: &str, documents: usize) {
    counter!(
        "cloud_search_documents_requeued_total",
        "index" => index.to_string()
    )
    .increment(documents as u64);
}

/// Set the pending document count of an update context
pub fn set_pending_documents(index: &str, count: usize) {
    gauge!(
        "cloud_search_pending_documents",
        "index" => index.to_string()
    )
    .set(count as f64);
}

/// Record commit duration
pub fn record_commit_latency(index: &str, duration: Duration) {
    histogram!(
        "cloud_search_commit_seconds",
        "index" => index.to_string()
    )
    .record(duration.as_secs_f64());
}

/// A timing guard that records query latency on drop
pub struct LatencyTimer {
    index: String,
    start: Instant,
}

impl LatencyTimer {
    pub fn new(index: &str) -> Self {
        Self { index: index.to_string(), start: Instant::now() }
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        record_query_latency(&self.index, self.start.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // No recorder installed: these only verify the calls don't panic.

    #[test]
    fn test_query_metrics() {
        record_query("pages", "rows", "success");
        record_query("pages", "count", "error");
        record_query_latency("pages", Duration::from_millis(5));
        record_rows_returned("pages", 10);
    }

    #[test]
    fn test_commit_metrics() {
        record_batch_posted("pages", 100, true);
        record_batch_posted("pages", 100, false);
        record_documents_requeued("pages", 42);
        set_pending_documents("pages", 7);
        record_commit_latency("pages", Duration::from_millis(50));
    }

    #[test]
    fn test_latency_timer() {
        {
            let _timer = LatencyTimer::new("pages");
            std::thread::sleep(Duration::from_micros(10));
        }
    }
}
