use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgArguments, PgConnectOptions, PgPool, PgPoolOptions, PgQueryResult, PgRow, PgSslMode};
use sqlx::query::Query;
use sqlx::{Postgres, Transaction};
use crate::config::{SslMode, StorageConfig};
use crate::error::{StorageError, StorageErrorKind, StorageResult};
use crate::events::trade::PriceRow;
use crate::interfaces::price_store::PriceStore;
use crate::interfaces::view_refresher::ViewRefresher;
use crate::storage::schema::{Granularity, INSERT_PRICE};

/// Owns one connection pool to the store. Each task gets its own gateway so a
/// slow or failing client never blocks another.
#[derive(Clone, Debug)]
pub struct StorageGateway {
    pool: PgPool,
    role: &'static str,
}

impl StorageGateway {
    /// Connects eagerly. Logs the outcome exactly once.
    pub async fn connect(cfg: &StorageConfig, role: &'static str) -> StorageResult<Self> {
        let result = match connect_options(cfg) {
            Ok(options) => PgPoolOptions::new()
                .max_connections(cfg.max_connections)
                .acquire_timeout(cfg.connect_timeout())
                .connect_with(options)
                .await
                .map_err(StorageError::from),
            Err(e) => Err(e),
        };

        match result {
            Ok(pool) => {
                tracing::info!(role, ssl_mode = ?cfg.ssl_mode, "Connected to storage");
                Ok(StorageGateway { pool, role })
            }
            Err(e) => {
                tracing::error!(role, code = ?e.code, error = %e, "Storage connection failed");
                Err(e)
            }
        }
    }

    pub async fn execute<'q>(&self, query: Query<'q, Postgres, PgArguments>) -> StorageResult<PgQueryResult> {
        query.execute(&self.pool).await.map_err(StorageError::from)
    }

    pub async fn fetch_optional<'q>(&self, query: Query<'q, Postgres, PgArguments>) -> StorageResult<Option<PgRow>> {
        query.fetch_optional(&self.pool).await.map_err(StorageError::from)
    }

    pub async fn begin(&self) -> StorageResult<Transaction<'static, Postgres>> {
        self.pool.begin().await.map_err(StorageError::from)
    }

    /// Checks out a dedicated connection, held until dropped.
    pub async fn acquire(&self) -> StorageResult<PoolConnection<Postgres>> {
        self.pool.acquire().await.map_err(StorageError::from)
    }

    /// Waits for checked-out connections to return, then closes them all.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!(role = self.role, "Storage connection closed");
    }
}

fn connect_options(cfg: &StorageConfig) -> StorageResult<PgConnectOptions> {
    let options: PgConnectOptions = cfg.url.parse().map_err(|e: sqlx::Error| {
        StorageError::new(StorageErrorKind::Connection, format!("invalid storage url: {}", e))
            .with_code("08001")
    })?;

    let options = options.ssl_mode(match cfg.ssl_mode {
        SslMode::Disable => PgSslMode::Disable,
        // Require encrypts but skips certificate verification.
        SslMode::Relaxed => PgSslMode::Require,
        SslMode::VerifyFull => PgSslMode::VerifyFull,
    });

    if cfg.statement_timeout_secs > 0 {
        let timeout = format!("{}s", cfg.statement_timeout_secs);
        Ok(options.options([("statement_timeout", timeout)]))
    } else {
        Ok(options)
    }
}

#[async_trait]
impl PriceStore for StorageGateway {
    async fn insert_price(&self, row: &PriceRow) -> StorageResult<()> {
        let query = sqlx::query(INSERT_PRICE)
            .bind(row.time)
            .bind(row.price)
            .bind(row.volume)
            .bind(row.currency_code.as_deref());
        self.execute(query).await?;
        Ok(())
    }
}

#[async_trait]
impl ViewRefresher for StorageGateway {
    async fn refresh_view(&self, granularity: Granularity) -> StorageResult<()> {
        self.execute(sqlx::query(granularity.refresh_sql())).await?;
        Ok(())
    }
}
