use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::{Connection, Postgres};
use uuid::Uuid;
use crate::config::StorageConfig;
use crate::core::diagnostic::DiagnosticRecord;
use crate::error::{StorageError, StorageErrorKind, StorageResult};
use crate::interfaces::diagnostic_probe::DiagnosticProbe;
use crate::storage::gateway::StorageGateway;

/// Probe backed by its own gateway and a scratch table unique to this run, so
/// it never touches the ingestion connection or `tata_prices`.
pub struct PgDiagnosticProbe {
    cfg: StorageConfig,
    table: String,
    gateway: Option<StorageGateway>,
    conn: Option<PoolConnection<Postgres>>,
}

impl PgDiagnosticProbe {
    pub fn new(cfg: StorageConfig) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        PgDiagnosticProbe {
            cfg,
            table: format!("diagnostic_test_{}", &suffix[..12]),
            gateway: None,
            conn: None,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn conn(&mut self) -> StorageResult<&mut PoolConnection<Postgres>> {
        self.conn.as_mut().ok_or_else(|| {
            StorageError::new(StorageErrorKind::Connection, "No database connection").with_code("08003")
        })
    }
}

#[async_trait]
impl DiagnosticProbe for PgDiagnosticProbe {
    async fn connect(&mut self) -> StorageResult<()> {
        let gateway = StorageGateway::connect(&self.cfg, "diagnostic").await?;
        let conn = gateway.acquire().await;
        self.gateway = Some(gateway);
        self.conn = Some(conn?);
        Ok(())
    }

    async fn create_scratch_table(&mut self) -> StorageResult<()> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id SERIAL PRIMARY KEY,
                test_data TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
            )",
            self.table
        );
        sqlx::query(&sql).execute(&mut **self.conn()?).await?;
        Ok(())
    }

    async fn write_row(&mut self, test_data: &str) -> StorageResult<()> {
        let sql = format!("INSERT INTO {} (test_data) VALUES ($1)", self.table);
        sqlx::query(&sql).bind(test_data).execute(&mut **self.conn()?).await?;
        Ok(())
    }

    async fn read_latest(&mut self) -> StorageResult<DiagnosticRecord> {
        let sql = format!(
            "SELECT id, test_data, created_at FROM {} ORDER BY created_at DESC, id DESC LIMIT 1",
            self.table
        );
        let record = sqlx::query_as::<_, DiagnosticRecord>(&sql)
            .fetch_one(&mut **self.conn()?)
            .await?;
        Ok(record)
    }

    async fn transacted_write(&mut self, test_data: &str) -> StorageResult<()> {
        let sql = format!("INSERT INTO {} (test_data) VALUES ($1)", self.table);
        let conn = self.conn()?;
        let mut tx = conn.begin().await?;

        match sqlx::query(&sql).bind(test_data).execute(&mut *tx).await {
            Ok(_) => {
                tx.commit().await?;
                Ok(())
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::warn!(error = %rollback, "Diagnostic rollback failed");
                }
                Err(e.into())
            }
        }
    }

    async fn cleanup(&mut self) {
        if let Some(mut conn) = self.conn.take() {
            let sql = format!("DROP TABLE IF EXISTS {}", self.table);
            if let Err(e) = sqlx::query(&sql).execute(&mut *conn).await {
                tracing::warn!(table = %self.table, error = %e, "Failed to drop diagnostic table");
            }
        }
        if let Some(gateway) = self.gateway.take() {
            gateway.close().await;
        }
    }
}
