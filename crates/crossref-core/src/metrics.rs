//! Prometheus metrics helpers for the extraction pipeline.
//!
//! Recording goes through the `metrics` facade, so every call is a no-op
//! until a recorder is installed.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crossref_core::metrics::init_metrics;
//!
//! // Serve /metrics on port 9091 from the exporter's own listener thread
//! init_metrics(9091)?;
//!
//! metrics::counter!("extract_records_total").increment(1);
//! ```
//!
//! # Metric Naming Conventions
//!
//! - Prefix: `extract_`
//! - Suffix: unit or type (`_total`, `_bytes`)
//! - Labels only where cardinality is fixed (`outcome`)

use crate::{Error, Result};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;

/// Install the Prometheus recorder and start its HTTP listener.
///
/// Must be called at most once per process. The exporter spawns its own
/// background runtime, so callers do not need an async context.
pub fn init_metrics(port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| Error::Metrics(e.to_string()))?;

    register_common_metrics();
    tracing::info!("Metrics server listening on http://{}/metrics", addr);
    Ok(())
}

/// Install a recorder without an HTTP listener.
///
/// Returns `None` if a recorder is already installed. Useful for tests.
pub fn try_init_metrics() -> Option<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder().ok()?;
    register_common_metrics();
    Some(handle)
}

fn register_common_metrics() {
    describe_counter!(
        "extract_records_total",
        "Records decoded from archives"
    );
    describe_counter!(
        "extract_records_matched_total",
        "Records whose publication is in the target set"
    );
    describe_counter!(
        "extract_records_written_total",
        "Matched records accepted by the sink"
    );
    describe_counter!(
        "extract_records_skipped_total",
        "Matched records rejected by the sink (missing DOI, insert failure)"
    );
    describe_counter!(
        "extract_decode_errors_total",
        "Malformed records that aborted an archive"
    );
    describe_counter!(
        "extract_archives_total",
        "Archives processed (label: outcome = done|aborted|failed)"
    );
    describe_counter!(
        "extract_archive_bytes_total",
        "Compressed bytes of archives opened"
    );
    describe_gauge!(
        "extract_running",
        "Whether an extraction walk is running (1=yes, 0=no)"
    );
}

/// Count one finished archive under its outcome label.
#[inline]
pub fn record_archive(outcome: &'static str) {
    metrics::counter!("extract_archives_total", "outcome" => outcome).increment(1);
}

/// Increment a counter.
#[inline]
pub fn increment(name: &'static str, count: u64) {
    metrics::counter!(name).increment(count);
}

/// Set a gauge value.
#[inline]
pub fn set_gauge(name: &'static str, value: f64) {
    metrics::gauge!(name).set(value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Once;

    static INIT: Once = Once::new();

    fn ensure_metrics_init() {
        INIT.call_once(|| {
            let _ = try_init_metrics();
        });
    }

    #[test]
    fn test_try_init_metrics_idempotent() {
        let handle1 = try_init_metrics();
        let handle2 = try_init_metrics();
        assert!(handle1.is_none() || handle2.is_none());
    }

    #[test]
    fn test_helpers_do_not_panic() {
        ensure_metrics_init();
        increment("extract_records_total", 0);
        increment("extract_records_total", 10);
        record_archive("done");
        record_archive("aborted");
        set_gauge("extract_running", 1.0);
        set_gauge("extract_running", 0.0);
    }

    #[test]
    fn test_register_common_metrics_twice() {
        ensure_metrics_init();
        register_common_metrics();
        register_common_metrics();
    }
}
