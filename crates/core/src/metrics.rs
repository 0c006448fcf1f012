//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Update runs (outcomes, per-item results, duration)
//! - Source requests (listing-id probes and item fetches)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts};

// =============================================================================
// Update Engine
// =============================================================================

/// Update runs by source and outcome.
pub static UPDATE_RUNS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("torrentdb_update_runs_total", "Total update runs"),
        &["source", "outcome"], // "updated", "up_to_date", "failed", "cancelled"
    )
    .unwrap()
});

/// Items attempted during updates, by result.
pub static UPDATE_ITEMS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "torrentdb_update_items_total",
            "Items processed by update runs",
        ),
        &["source", "result"], // "succeeded", "failed"
    )
    .unwrap()
});

/// Update run duration in seconds.
pub static UPDATE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "torrentdb_update_duration_seconds",
            "Duration of update runs",
        )
        .buckets(vec![0.1, 1.0, 5.0, 15.0, 60.0, 300.0, 900.0, 3600.0]),
        &["source"],
    )
    .unwrap()
});

// =============================================================================
// Sources
// =============================================================================

/// Requests made to remote sources.
pub static SOURCE_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "torrentdb_source_requests_total",
            "Requests made to remote sources",
        ),
        &["source", "operation", "status"], // status: "ok" or an error kind
    )
    .unwrap()
});

/// Returns all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(UPDATE_RUNS.clone()),
        Box::new(UPDATE_ITEMS.clone()),
        Box::new(UPDATE_DURATION.clone()),
        Box::new(SOURCE_REQUESTS.clone()),
    ]
}
