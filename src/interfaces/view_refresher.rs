use crate::error::StorageResult;
use crate::storage::schema::Granularity;
use async_trait::async_trait;

#[async_trait]
pub trait ViewRefresher: Send + Sync {
    /// Recomputes every bucket of one rollup from the current raw rows.
    async fn refresh_view(&self, granularity: Granularity) -> StorageResult<()>;
}
