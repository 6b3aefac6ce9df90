use std::sync::Arc;
use std::time::Duration;
use anyhow::Context;
use trade_ingest::api::rest;
use trade_ingest::config::AppConfig;
use trade_ingest::core::ingestion::IngestionLoop;
use trade_ingest::core::rollup_refresher::RollupRefresher;
use trade_ingest::event_log::consumer::RedisQueueConsumer;
use trade_ingest::event_log::dead_letter::RedisDeadLetterSink;
use trade_ingest::observability;
use trade_ingest::storage::StorageGateway;
use trade_ingest::utils::shutdown;
use trade_ingest::utils::task_supervisor::TaskSupervisor;
use trade_ingest::SHUTDOWN_GRACE_SECS;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let env = AppConfig::env_name();
    let cfg = AppConfig::load(&env).context("loading configuration")?;
    observability::tracing::init(&cfg.logging);
    observability::metrics::register_metrics();
    tracing::info!(env = %env, channel = %cfg.queue.channel, "Starting trade ingestion service");

    let (trigger, shutdown) = shutdown::channel();
    tokio::spawn(shutdown::listen_for_shutdown(trigger.clone()));

    // One gateway per task, never shared.
    let ingestion_store = StorageGateway::connect(&cfg.storage, "ingestion").await?;
    let rollup_store = StorageGateway::connect(&cfg.rollup_storage(), "rollup").await?;

    let source = RedisQueueConsumer::connect(&cfg.queue.url, &cfg.queue.channel).await?;
    let mut ingestion = IngestionLoop::new(
        Box::new(source),
        Arc::new(ingestion_store.clone()),
        cfg.ingestion.clone(),
    );
    if let Some(channel) = &cfg.queue.dead_letter_channel {
        let sink = RedisDeadLetterSink::connect(&cfg.queue.url, channel).await?;
        ingestion = ingestion.with_dead_letter(Arc::new(sink));
    }

    let refresher = RollupRefresher::new(Arc::new(rollup_store.clone()), cfg.rollup.refresh_interval());

    let mut supervisor = TaskSupervisor::new();
    supervisor
        .spawn("ingestion", ingestion.run(shutdown.clone()))
        .spawn("rollup_refresher", refresher.run(shutdown.clone()))
        .spawn("health_server", rest::serve(cfg.server.bind_addr.clone(), shutdown.clone()));

    let exit = supervisor.wait_any().await;
    trigger.trigger();
    supervisor.shutdown(Duration::from_secs(SHUTDOWN_GRACE_SECS)).await;

    ingestion_store.close().await;
    rollup_store.close().await;

    match exit {
        Some((name, Err(e))) => {
            tracing::error!(task = %name, error = %e, "Task failed, exiting");
            Err(anyhow::Error::new(e).context(format!("task {} failed", name)))
        }
        Some((name, Ok(()))) => {
            tracing::info!(task = %name, "Shutdown complete");
            Ok(())
        }
        None => Ok(()),
    }
}
