//! Prometheus metrics for scan cycles.
//!
//! This module provides metrics for:
//! - Venue fetch latency and failures
//! - Records normalized, skipped and dropped per venue
//! - Matches, degenerate pairs and emitted records
//! - Whole-cycle latency

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use tracing::{debug, info};

use crate::market::Venue;

// === Metric Name Constants ===

/// Venue fetch latency metric name.
pub const METRIC_FETCH_LATENCY: &str = "venue_fetch_latency_ms";
/// Analysis cycle latency metric name.
pub const METRIC_CYCLE_LATENCY: &str = "cycle_latency_ms";
/// Venue fetch failures counter metric name.
pub const METRIC_FETCH_FAILURES: &str = "venue_fetch_failures_total";
/// Records normalized counter metric name.
pub const METRIC_RECORDS_NORMALIZED: &str = "records_normalized_total";
/// Records outside the series counter metric name.
pub const METRIC_RECORDS_SKIPPED: &str = "records_skipped_total";
/// Malformed records counter metric name.
pub const METRIC_RECORDS_DROPPED: &str = "records_dropped_total";
/// Matches committed counter metric name.
pub const METRIC_MATCHES: &str = "matches_total";
/// Degenerate pairs counter metric name.
pub const METRIC_DEGENERATE_PAIRS: &str = "degenerate_pairs_total";
/// Emitted records counter metric name.
pub const METRIC_RECORDS_EMITTED: &str = "records_emitted_total";
/// Completed cycles counter metric name.
pub const METRIC_CYCLES: &str = "cycles_total";

/// Initialize all metric descriptions.
/// Call this once at startup to register metrics with descriptions.
pub fn init_metrics() {
    // Latency histograms
    describe_histogram!(
        METRIC_FETCH_LATENCY,
        "Venue listing fetch latency in milliseconds"
    );
    describe_histogram!(
        METRIC_CYCLE_LATENCY,
        "Normalize, match and bound latency per cycle in milliseconds"
    );

    // Counters
    describe_counter!(
        METRIC_FETCH_FAILURES,
        "Total number of failed venue fetches"
    );
    describe_counter!(
        METRIC_RECORDS_NORMALIZED,
        "Total number of venue records normalized into contracts"
    );
    describe_counter!(
        METRIC_RECORDS_SKIPPED,
        "Total number of venue records outside the configured series"
    );
    describe_counter!(
        METRIC_RECORDS_DROPPED,
        "Total number of malformed venue records dropped"
    );
    describe_counter!(METRIC_MATCHES, "Total number of cross-venue matches");
    describe_counter!(
        METRIC_DEGENERATE_PAIRS,
        "Total number of matched pairs with no safe multiplier"
    );
    describe_counter!(
        METRIC_RECORDS_EMITTED,
        "Total number of arbitrage records emitted"
    );
    describe_counter!(METRIC_CYCLES, "Total number of completed analysis cycles");

    debug!("Metrics initialized");
}

/// Install the Prometheus recorder with an HTTP scrape listener.
pub fn install_prometheus_exporter(port: u16) -> Result<(), BuildError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    info!(%addr, "Prometheus exporter listening");
    Ok(())
}

/// Record venue fetch latency.
pub fn record_fetch_latency(start: Instant, venue: Venue) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_FETCH_LATENCY, "venue" => venue.to_string()).record(latency_ms);
}

/// Increment fetch failures counter.
pub fn inc_fetch_failures(venue: Venue) {
    counter!(METRIC_FETCH_FAILURES, "venue" => venue.to_string()).increment(1);
}

/// Increment records normalized counter.
pub fn inc_records_normalized(venue: Venue) {
    counter!(METRIC_RECORDS_NORMALIZED, "venue" => venue.to_string()).increment(1);
}

/// Increment records skipped counter.
pub fn inc_records_skipped(venue: Venue) {
    counter!(METRIC_RECORDS_SKIPPED, "venue" => venue.to_string()).increment(1);
}

/// Increment records dropped counter.
pub fn inc_records_dropped(venue: Venue, reason: &'static str) {
    counter!(
        METRIC_RECORDS_DROPPED,
        "venue" => venue.to_string(),
        "reason" => reason
    )
    .increment(1);
}

/// Add committed matches.
pub fn inc_matches(count: usize) {
    counter!(METRIC_MATCHES).increment(count as u64);
}

/// Increment degenerate pairs counter.
pub fn inc_degenerate_pairs() {
    counter!(METRIC_DEGENERATE_PAIRS).increment(1);
}

/// Add emitted records.
pub fn inc_records_emitted(count: usize) {
    counter!(METRIC_RECORDS_EMITTED).increment(count as u64);
}

/// Increment completed cycles counter.
pub fn inc_cycles() {
    counter!(METRIC_CYCLES).increment(1);
}

/// RAII guard for timing operations.
/// Automatically records latency when dropped.
pub struct LatencyTimer {
    start: Instant,
    metric_name: &'static str,
}

impl LatencyTimer {
    /// Create a new latency timer for the given metric.
    pub fn new(metric_name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            metric_name,
        }
    }

    /// Get elapsed time in milliseconds (without recording).
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        histogram!(self.metric_name).record(self.elapsed_ms());
    }
}

/// Create a latency timer for one analysis cycle.
pub fn timer_cycle() -> LatencyTimer {
    LatencyTimer::new(METRIC_CYCLE_LATENCY)
}
