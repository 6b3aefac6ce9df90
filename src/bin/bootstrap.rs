//! Creates `tata_prices`, its hypertable and the `klines_*` rollups.
//!
//! `bootstrap --reset` drops the views and the table first. All stored prices
//! are lost.

use anyhow::Context;
use trade_ingest::config::AppConfig;
use trade_ingest::observability;
use trade_ingest::storage::schema;
use trade_ingest::storage::StorageGateway;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let reset = std::env::args().skip(1).any(|arg| arg == "--reset");
    let cfg = AppConfig::load(&AppConfig::env_name()).context("loading configuration")?;
    observability::tracing::init(&cfg.logging);

    let gateway = StorageGateway::connect(&cfg.storage, "bootstrap").await?;
    let result = schema::bootstrap(&gateway, reset).await;
    gateway.close().await;

    result.context("initializing database")?;
    Ok(())
}
