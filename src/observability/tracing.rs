use tracing::Span;
use tracing_subscriber::EnvFilter;
use crate::config::{LogFormat, LoggingConfig};

/// Installs the global subscriber. `RUST_LOG` overrides the configured level.
/// A second call is a no-op.
pub fn init(cfg: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let _ = match cfg.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    };
}

pub fn trace_message(seq: u64) -> Span {
    tracing::info_span!(
        "ingest_message",
        seq,
    )
}

pub fn trace_rollup_tick(tick: u64) -> Span {
    tracing::info_span!(
        "rollup_tick",
        tick,
    )
}
