//! Runs the storage diagnostic once and prints the result as JSON.
//! Exits non-zero when any stage fails.

use anyhow::Context;
use trade_ingest::config::AppConfig;
use trade_ingest::core::diagnostic::DiagnosticHarness;
use trade_ingest::observability;
use trade_ingest::storage::diagnostic_probe::PgDiagnosticProbe;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let cfg = AppConfig::load(&AppConfig::env_name()).context("loading configuration")?;
    observability::tracing::init(&cfg.logging);

    let result = DiagnosticHarness::new(PgDiagnosticProbe::new(cfg.storage.clone()))
        .run()
        .await;

    println!("{}", serde_json::to_string_pretty(&result)?);

    if !result.success {
        std::process::exit(1);
    }
    Ok(())
}
