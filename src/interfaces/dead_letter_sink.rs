use crate::error::Result;
use crate::events::dead_letter::DeadLetter;
use async_trait::async_trait;

#[async_trait]
pub trait DeadLetterSink: Send + Sync {
    async fn publish(&self, letter: &DeadLetter) -> Result<()>;
}
