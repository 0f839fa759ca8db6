use std::net::SocketAddr;

// ── Fetch metrics (request-driven) ───────────────────────────────

/// Counter: busy-interval fetches issued. Labels: reason.
pub const FETCHES_TOTAL: &str = "slotwise_fetches_total";

/// Counter: fetches that failed for the current epoch.
pub const FETCH_FAILURES_TOTAL: &str = "slotwise_fetch_failures_total";

/// Counter: responses dropped because a newer epoch was issued.
pub const STALE_RESPONSES_TOTAL: &str = "slotwise_stale_responses_total";

/// Histogram: time from issue to response in seconds, stale or not.
pub const FETCH_DURATION_SECONDS: &str = "slotwise_fetch_duration_seconds";

// ── Grid metrics ─────────────────────────────────────────────────

/// Gauge: slots in the most recently published grid. Labels: state.
pub const SLOTS_PUBLISHED: &str = "slotwise_slots_published";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), metrics_exporter_prometheus::BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}
