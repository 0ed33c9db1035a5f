// Prometheus metrics definitions for the bot.

use lazy_static::lazy_static;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // ── Counters ─────────────────────────────────────────────────────

    /// Slash commands handled, by command name.
    pub static ref COMMANDS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("royale_bot_commands_total", "Slash commands handled"),
        &["command"],
    )
    .unwrap();

    /// Upstream player lookups, by outcome (ok, not_found, error).
    pub static ref UPSTREAM_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("royale_bot_upstream_requests_total", "Upstream player lookups"),
        &["outcome"],
    )
    .unwrap();

    /// Interactions rejected for a missing or invalid signature.
    pub static ref SIGNATURE_REJECTIONS_TOTAL: IntCounter = IntCounter::new(
        "royale_bot_signature_rejections_total",
        "Interactions rejected for a bad signature",
    )
    .unwrap();

    /// Successful flushes of the registration file.
    pub static ref STORE_WRITES_TOTAL: IntCounter = IntCounter::new(
        "royale_bot_store_writes_total",
        "Registration file writes",
    )
    .unwrap();

    // ── Histograms ───────────────────────────────────────────────────

    /// Upstream player lookup latency in seconds.
    pub static ref UPSTREAM_REQUEST_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "royale_bot_upstream_request_duration_seconds",
            "Upstream player lookup latency in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
    )
    .unwrap();
}

/// Register all metrics with the custom registry. Call once at startup.
pub fn register_metrics() {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(COMMANDS_TOTAL.clone()),
        Box::new(UPSTREAM_REQUESTS_TOTAL.clone()),
        Box::new(SIGNATURE_REJECTIONS_TOTAL.clone()),
        Box::new(STORE_WRITES_TOTAL.clone()),
        Box::new(UPSTREAM_REQUEST_DURATION_SECONDS.clone()),
    ];

    for c in collectors {
        if let Err(e) = REGISTRY.register(c) {
            tracing::warn!("Metric registration skipped: {e}");
        }
    }
}

/// Serialize all registered metrics to the Prometheus text exposition format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {e}");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
