use crate::error::{Error, Result};
use crate::interfaces::message_source::MessageSource;
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;

/// Right-pops from a Redis list, blocking without timeout.
///
/// The connection is dedicated to this consumer: a pending BRPOP holds the
/// multiplexed pipeline, so nothing else should share it.
pub struct RedisQueueConsumer {
    conn: MultiplexedConnection,
    channel: String,
}

impl RedisQueueConsumer {
    pub async fn connect(url: &str, channel: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| Error::Queue(format!("invalid queue url: {}", e)))?;

        match client.get_multiplexed_tokio_connection().await {
            Ok(conn) => {
                tracing::info!(channel, "Connected to queue");
                Ok(RedisQueueConsumer {
                    conn,
                    channel: channel.to_string(),
                })
            }
            Err(e) => {
                tracing::error!(channel, error = %e, "Queue connection failed");
                Err(e.into())
            }
        }
    }
}

#[async_trait]
impl MessageSource for RedisQueueConsumer {
    async fn pop(&mut self) -> Result<Vec<u8>> {
        // Timeout 0 blocks until a message arrives.
        let popped: Option<(String, Vec<u8>)> = redis::cmd("BRPOP")
            .arg(&self.channel)
            .arg(0)
            .query_async(&mut self.conn)
            .await?;

        popped
            .map(|(_, payload)| payload)
            .ok_or_else(|| Error::Queue(format!("BRPOP on {} returned nil", self.channel)))
    }
}
