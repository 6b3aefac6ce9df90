use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::Instrument;
use crate::error::{Result, StorageError};
use crate::interfaces::view_refresher::ViewRefresher;
use crate::observability::metrics::{ROLLUP_REFRESHES, ROLLUP_REFRESH_FAILURES};
use crate::observability::tracing::trace_rollup_tick;
use crate::storage::schema::Granularity;
use crate::utils::shutdown::Shutdown;

#[derive(Debug)]
pub struct TickReport {
    pub tick: u64,
    pub refreshed: Vec<Granularity>,
    pub failed: Vec<(Granularity, StorageError)>,
}

impl TickReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Recomputes every rollup on a fixed interval, on its own connection.
///
/// Refreshes are total, so a failed or missed tick heals on the next one.
pub struct RollupRefresher {
    store: Arc<dyn ViewRefresher>,
    interval: Duration,
    tick: u64,
}

impl RollupRefresher {
    pub fn new(store: Arc<dyn ViewRefresher>, interval: Duration) -> Self {
        RollupRefresher {
            store,
            interval,
            tick: 0,
        }
    }

    /// Refreshes each granularity in order. A Constraint or Transient failure
    /// is recorded and the remaining views still run; a connection failure
    /// aborts the tick.
    pub async fn refresh_all(&mut self) -> Result<TickReport> {
        self.tick += 1;
        let mut report = TickReport {
            tick: self.tick,
            refreshed: Vec::with_capacity(Granularity::ALL.len()),
            failed: Vec::new(),
        };

        for granularity in Granularity::ALL {
            match self.store.refresh_view(granularity).await {
                Ok(()) => {
                    ROLLUP_REFRESHES.inc();
                    report.refreshed.push(granularity);
                }
                Err(e) if e.is_connection() => {
                    tracing::error!(view = %granularity, error = %e, "Storage connection lost, halting rollup refresher");
                    return Err(e.into());
                }
                Err(e) => {
                    ROLLUP_REFRESH_FAILURES.inc();
                    tracing::warn!(view = %granularity, code = ?e.code, error = %e, "Materialized view refresh failed");
                    report.failed.push((granularity, e));
                }
            }
        }

        if report.is_complete() {
            tracing::info!("Materialized views refreshed successfully");
        }
        Ok(report)
    }

    /// First tick fires immediately. Overrunning ticks delay the schedule
    /// instead of bursting.
    pub async fn run(mut self, shutdown: Shutdown) -> Result<()> {
        tracing::info!(interval_secs = self.interval.as_secs(), "Rollup refresher started");

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.clone().wait() => {
                    tracing::info!(ticks = self.tick, "Rollup refresher stopping");
                    return Ok(());
                }
                _ = ticker.tick() => {}
            }

            let span = trace_rollup_tick(self.tick + 1);
            self.refresh_all().instrument(span).await?;
        }
    }
}
