use serde::Serialize;
use crate::error::{StorageError, StorageResult};
use crate::storage::gateway::StorageGateway;

pub const PRICES_TABLE: &str = "tata_prices";

pub const INSERT_PRICE: &str =
    "INSERT INTO tata_prices (time, price, volume, currency_code) VALUES ($1, $2, $3, $4)";

const CREATE_PRICES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS tata_prices (
    time           TIMESTAMP WITH TIME ZONE NOT NULL,
    price          DOUBLE PRECISION,
    volume         DOUBLE PRECISION,
    currency_code  VARCHAR(10)
)"#;

const CREATE_HYPERTABLE: &str =
    "SELECT create_hypertable('tata_prices', 'time', if_not_exists => TRUE)";

const DROP_PRICES_TABLE: &str = "DROP TABLE IF EXISTS tata_prices";

/// Rollup widths, in refresh order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Granularity {
    OneMinute,
    OneHour,
    OneWeek,
}

impl Granularity {
    pub const ALL: [Granularity; 3] = [Granularity::OneMinute, Granularity::OneHour, Granularity::OneWeek];

    pub fn view_name(self) -> &'static str {
        match self {
            Granularity::OneMinute => "klines_1m",
            Granularity::OneHour => "klines_1h",
            Granularity::OneWeek => "klines_1w",
        }
    }

    /// `time_bucket` interval literal.
    pub fn bucket_width(self) -> &'static str {
        match self {
            Granularity::OneMinute => "1 minute",
            Granularity::OneHour => "1 hour",
            Granularity::OneWeek => "1 week",
        }
    }

    pub fn refresh_sql(self) -> &'static str {
        match self {
            Granularity::OneMinute => "REFRESH MATERIALIZED VIEW klines_1m",
            Granularity::OneHour => "REFRESH MATERIALIZED VIEW klines_1h",
            Granularity::OneWeek => "REFRESH MATERIALIZED VIEW klines_1w",
        }
    }

    pub fn create_sql(self) -> String {
        format!(
            r#"
CREATE MATERIALIZED VIEW IF NOT EXISTS {view} AS
SELECT
    time_bucket('{width}', time) AS bucket,
    first(price, time) AS open,
    max(price) AS high,
    min(price) AS low,
    last(price, time) AS close,
    sum(volume) AS volume,
    currency_code
FROM {table}
GROUP BY bucket, currency_code"#,
            view = self.view_name(),
            width = self.bucket_width(),
            table = PRICES_TABLE,
        )
    }

    pub fn drop_sql(self) -> String {
        format!("DROP MATERIALIZED VIEW IF EXISTS {}", self.view_name())
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.view_name())
    }
}

/// Ordered DDL for the raw table and its rollups. With `reset`, existing views
/// and the table are dropped first; this destroys all stored prices.
pub fn bootstrap_statements(reset: bool) -> Vec<String> {
    let mut statements = Vec::new();

    if reset {
        statements.extend(Granularity::ALL.iter().map(|g| g.drop_sql()));
        statements.push(DROP_PRICES_TABLE.to_string());
    }

    statements.push(CREATE_PRICES_TABLE.to_string());
    statements.push(CREATE_HYPERTABLE.to_string());
    statements.extend(Granularity::ALL.iter().map(|g| g.create_sql()));
    statements
}

/// Runs the bootstrap in one transaction: either every object exists afterwards
/// or nothing changed.
pub async fn bootstrap(gateway: &StorageGateway, reset: bool) -> StorageResult<()> {
    let mut tx = gateway.begin().await?;

    for statement in bootstrap_statements(reset) {
        if let Err(e) = sqlx::query(&statement).execute(&mut *tx).await {
            let err = StorageError::from(e);
            tracing::error!(error = %err, statement = %statement.trim(), "Bootstrap statement failed");
            if let Err(rollback) = tx.rollback().await {
                tracing::warn!(error = %rollback, "Bootstrap rollback failed");
            }
            return Err(err);
        }
    }

    tx.commit().await.map_err(StorageError::from)?;
    tracing::info!(reset, "Database initialized successfully");
    Ok(())
}
