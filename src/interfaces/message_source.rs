use crate::error::Result;
use async_trait::async_trait;

/// Blocking dequeue over a named channel.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Suspends until a message is available. Each message is handed to exactly
    /// one caller. Errors mean the queue is unreachable.
    async fn pop(&mut self) -> Result<Vec<u8>>;
}
