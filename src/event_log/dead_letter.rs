use crate::error::Result;
use crate::events::dead_letter::DeadLetter;
use crate::interfaces::dead_letter_sink::DeadLetterSink;
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;

/// LPUSHes failed messages as JSON onto a side list, so the oldest failure is
/// the next one a BRPOP-based replayer would take.
pub struct RedisDeadLetterSink {
    conn: MultiplexedConnection,
    channel: String,
}

impl RedisDeadLetterSink {
    pub async fn connect(url: &str, channel: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_tokio_connection().await?;
        tracing::info!(channel, "Dead-letter channel ready");
        Ok(RedisDeadLetterSink {
            conn,
            channel: channel.to_string(),
        })
    }
}

#[async_trait]
impl DeadLetterSink for RedisDeadLetterSink {
    async fn publish(&self, letter: &DeadLetter) -> Result<()> {
        let body = serde_json::to_string(letter)?;
        let mut conn = self.conn.clone();
        redis::cmd("LPUSH")
            .arg(&self.channel)
            .arg(body)
            .query_async::<_, i64>(&mut conn)
            .await?;
        Ok(())
    }
}
