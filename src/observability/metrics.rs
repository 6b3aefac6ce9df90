use lazy_static::lazy_static;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // Ingestion metrics
    pub static ref MESSAGES_CONSUMED: IntCounter = IntCounter::new(
        "messages_consumed_total",
        "Total number of messages dequeued"
    ).unwrap();

    pub static ref TRADES_PERSISTED: IntCounter = IntCounter::new(
        "trades_persisted_total",
        "Total number of price rows inserted"
    ).unwrap();

    pub static ref MESSAGES_IGNORED: IntCounter = IntCounter::new(
        "messages_ignored_total",
        "Total number of messages with a kind that is not persisted"
    ).unwrap();

    pub static ref DECODE_FAILURES: IntCounter = IntCounter::new(
        "decode_failures_total",
        "Total number of malformed messages"
    ).unwrap();

    pub static ref PERSIST_FAILURES: IntCounter = IntCounter::new(
        "persist_failures_total",
        "Total number of messages dropped after a storage error"
    ).unwrap();

    pub static ref PERSIST_RETRIES: IntCounter = IntCounter::new(
        "persist_retries_total",
        "Total number of insert retries after a transient storage error"
    ).unwrap();

    pub static ref DEAD_LETTERED: IntCounter = IntCounter::new(
        "dead_lettered_total",
        "Total number of messages pushed to the dead-letter channel"
    ).unwrap();

    // Rollup metrics
    pub static ref ROLLUP_REFRESHES: IntCounter = IntCounter::new(
        "rollup_refreshes_total",
        "Total number of successful rollup view refreshes"
    ).unwrap();

    pub static ref ROLLUP_REFRESH_FAILURES: IntCounter = IntCounter::new(
        "rollup_refresh_failures_total",
        "Total number of failed rollup view refreshes"
    ).unwrap();

    // Latency metrics
    pub static ref INSERT_LATENCY: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "insert_latency_seconds",
            "Price row insert latency"
        ).buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0])
    ).unwrap();
}

/// Registers every collector with [`REGISTRY`]. Safe to call more than once.
pub fn register_metrics() {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(MESSAGES_CONSUMED.clone()),
        Box::new(TRADES_PERSISTED.clone()),
        Box::new(MESSAGES_IGNORED.clone()),
        Box::new(DECODE_FAILURES.clone()),
        Box::new(PERSIST_FAILURES.clone()),
        Box::new(PERSIST_RETRIES.clone()),
        Box::new(DEAD_LETTERED.clone()),
        Box::new(ROLLUP_REFRESHES.clone()),
        Box::new(ROLLUP_REFRESH_FAILURES.clone()),
        Box::new(INSERT_LATENCY.clone()),
    ];

    for collector in collectors {
        match REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => tracing::warn!(error = %e, "Failed to register metric"),
        }
    }
}

/// Prometheus text exposition of [`REGISTRY`].
pub fn render() -> String {
    let mut buffer = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8(buffer).unwrap_or_default()
}
