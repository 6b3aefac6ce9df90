use crate::error::StorageResult;
use crate::events::trade::PriceRow;
use async_trait::async_trait;

#[async_trait]
pub trait PriceStore: Send + Sync {
    async fn insert_price(&self, row: &PriceRow) -> StorageResult<()>;
}
