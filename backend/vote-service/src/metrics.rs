//! Prometheus metrics for vote-service.
//!
//! Exposes vote ledger and feed collectors and an HTTP handler for the
//! `/metrics` endpoint.

use actix_web::HttpResponse;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Encoder, Histogram,
    IntCounter, IntCounterVec, TextEncoder,
};

lazy_static::lazy_static! {
    /// Committed vote units by outcome (inserted/flipped/unchanged)
    pub static ref VOTES_CAST_TOTAL: IntCounterVec = register_int_counter_vec!(
        "votes_cast_total",
        "Vote operations by outcome",
        &["outcome"]
    ).expect("Prometheus metrics registration should succeed at startup");

    /// Failed vote operations by error kind
    pub static ref VOTE_FAILURES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "vote_failures_total",
        "Vote operations that did not commit, by error kind",
        &["kind"]
    ).expect("Prometheus metrics registration should succeed at startup");

    /// Wall time of the atomic vote unit
    pub static ref VOTE_UNIT_DURATION_SECONDS: Histogram = register_histogram!(
        "vote_unit_duration_seconds",
        "Duration of the vote read-decide-write unit",
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0]
    ).expect("Prometheus metrics registration should succeed at startup");

    pub static ref FEED_PAGES_SERVED_TOTAL: IntCounter = register_int_counter!(
        "feed_pages_served_total",
        "Feed pages returned to callers"
    ).expect("Prometheus metrics registration should succeed at startup");

    pub static ref FEED_PAGE_SIZE: Histogram = register_histogram!(
        "feed_page_size",
        "Posts returned per feed page",
        vec![0.0, 1.0, 5.0, 10.0, 20.0, 30.0, 40.0, 50.0]
    ).expect("Prometheus metrics registration should succeed at startup");
}

/// Actix handler that renders Prometheus metrics in text format.
pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
