//! Prometheus metrics for the measurement API server.
//!
//! Covers archive fetches, frame decoding, duplicate measurement rows, VPN
//! upstream refreshes and listing query latency.
//!
//! The `/metrics` endpoint is unauthenticated; restrict it at the network
//! level to Prometheus scrapers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use std::sync::{LazyLock, Once};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// Archive metrics
pub static ARCHIVE_FETCHES: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "msmt_archive_fetches_total",
            "Total number of archive range fetches by backend",
        ),
        &["backend"],
    )
    .expect("metric creation failed")
});

pub static ARCHIVE_FETCH_FAILURES: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "msmt_archive_fetch_failures_total",
            "Total number of failed archive range fetches by backend",
        ),
        &["backend"],
    )
    .expect("metric creation failed")
});

pub static ARCHIVE_BYTES_FETCHED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "msmt_archive_bytes_fetched_total",
        "Total compressed bytes read from the archive store",
    )
    .expect("metric creation failed")
});

pub static FRAME_DECODE_FAILURES: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "msmt_frame_decode_failures_total",
        "Total number of archive frames that failed to decompress or slice",
    )
    .expect("metric creation failed")
});

pub static DUPLICATE_MEASUREMENT_ROWS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "msmt_duplicate_measurement_rows_total",
        "Total number of measurement lookups that matched more than one row",
    )
    .expect("metric creation failed")
});

pub static VPN_UPSTREAM_REFRESHES: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "msmt_vpn_upstream_refreshes_total",
            "Total VPN credential refreshes by provider and outcome",
        ),
        &["provider", "outcome"],
    )
    .expect("metric creation failed")
});

// Timing metrics
pub static LISTING_QUERY_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "msmt_listing_query_duration_seconds",
            "Time spent executing listing queries",
        )
        .buckets(vec![
            0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["listing"],
    )
    .expect("metric creation failed")
});

/// Guard to ensure metrics are only registered once.
static REGISTER_ONCE: Once = Once::new();

/// Register all metrics with the global registry.
///
/// Idempotent, so tests may build as many routers as they like.
pub fn register_metrics() {
    REGISTER_ONCE.call_once(|| {
        REGISTRY
            .register(Box::new(ARCHIVE_FETCHES.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(ARCHIVE_FETCH_FAILURES.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(ARCHIVE_BYTES_FETCHED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(FRAME_DECODE_FAILURES.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(DUPLICATE_MEASUREMENT_ROWS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(VPN_UPSTREAM_REFRESHES.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(LISTING_QUERY_DURATION.clone()))
            .expect("metric registration failed");
    });
}

/// GET /metrics - Prometheus metrics endpoint.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        ),
    }
}

/// Record the duration of a listing query, in seconds.
pub fn observe_listing_query(listing: &str, seconds: f64) {
    LISTING_QUERY_DURATION
        .with_label_values(&[listing])
        .observe(seconds);
}
