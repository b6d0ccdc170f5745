use std::net::SocketAddr;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: bookings committed.
pub const BOOKINGS_CREATED_TOTAL: &str = "matchpoint_bookings_created_total";

/// Counter: bookings cancelled.
pub const BOOKINGS_CANCELLED_TOTAL: &str = "matchpoint_bookings_cancelled_total";

/// Counter: booking attempts rejected on conflict. Labels: resource.
pub const BOOKING_CONFLICTS_TOTAL: &str = "matchpoint_booking_conflicts_total";

/// Counter: waitlist joins.
pub const WAITLIST_JOINS_TOTAL: &str = "matchpoint_waitlist_joins_total";

/// Counter: waitlist promotions (notification hook firings).
pub const WAITLIST_PROMOTIONS_TOTAL: &str = "matchpoint_waitlist_promotions_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Histogram: WAL group-commit flush duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "matchpoint_wal_flush_duration_seconds";

/// Histogram: WAL group-commit batch size (events per flush).
pub const WAL_FLUSH_BATCH_SIZE: &str = "matchpoint_wal_flush_batch_size";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}
