use std::sync::Arc;
use tracing::Instrument;
use crate::config::IngestionConfig;
use crate::error::{Error, Result, StorageError};
use crate::event_log::decoder;
use crate::events::dead_letter::{DeadLetter, DeadLetterReason};
use crate::events::trade::{Decoded, PriceRow, TradeEvent};
use crate::interfaces::dead_letter_sink::DeadLetterSink;
use crate::interfaces::message_source::MessageSource;
use crate::interfaces::price_store::PriceStore;
use crate::observability::metrics::{
    DEAD_LETTERED, DECODE_FAILURES, INSERT_LATENCY, MESSAGES_CONSUMED, MESSAGES_IGNORED,
    PERSIST_FAILURES, PERSIST_RETRIES, TRADES_PERSISTED,
};
use crate::observability::tracing::trace_message;
use crate::utils::shutdown::Shutdown;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IngestionState {
    /// Suspended on the queue pop.
    Waiting,
    Processing,
    /// A failure was logged for the current message. Always returns to Waiting.
    ErrorLogged,
}

/// What happened to one dequeued message.
#[derive(Clone, Debug, PartialEq)]
pub enum MessageOutcome {
    Persisted,
    Ignored { kind: String },
    /// Malformed payload, consumed and not retried.
    Rejected { reason: String },
    /// Store refused the row, or transient failures outlasted the retry budget.
    Dropped { error: StorageError, attempts: u32 },
}

/// Drains the queue into the price table, one message at a time, in dequeue
/// order.
///
/// Decode and per-message storage failures are contained here. Only a
/// connection-level failure of the queue or the store ends the loop.
pub struct IngestionLoop {
    source: Box<dyn MessageSource>,
    store: Arc<dyn PriceStore>,
    dead_letter: Option<Arc<dyn DeadLetterSink>>,
    policy: IngestionConfig,
    state: IngestionState,
    processed: u64,
}

impl IngestionLoop {
    pub fn new(
        source: Box<dyn MessageSource>,
        store: Arc<dyn PriceStore>,
        policy: IngestionConfig,
    ) -> Self {
        IngestionLoop {
            source,
            store,
            dead_letter: None,
            policy,
            state: IngestionState::Waiting,
            processed: 0,
        }
    }

    pub fn with_dead_letter(mut self, sink: Arc<dyn DeadLetterSink>) -> Self {
        self.dead_letter = Some(sink);
        self
    }

    pub fn state(&self) -> IngestionState {
        self.state
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    /// Runs until shutdown or a connection-level error.
    ///
    /// Shutdown is only observed while waiting on the queue; a message that has
    /// been dequeued is always processed to completion first.
    pub async fn run(mut self, shutdown: Shutdown) -> Result<()> {
        tracing::info!(
            max_attempts = self.policy.max_attempts,
            dead_letter = self.dead_letter.is_some(),
            "Ingestion loop started"
        );

        loop {
            self.state = IngestionState::Waiting;

            let raw = tokio::select! {
                biased;
                _ = shutdown.clone().wait() => {
                    tracing::info!(processed = self.processed, "Ingestion loop stopping");
                    return Ok(());
                }
                popped = self.source.pop() => match popped {
                    Ok(raw) => raw,
                    Err(e) => {
                        tracing::error!(error = %e, "Queue pop failed, halting ingestion");
                        return Err(e);
                    }
                },
            };

            self.processed += 1;
            let span = trace_message(self.processed);
            self.process_message(&raw).instrument(span).await?;
        }
    }

    /// Decodes and persists one payload. `Err` only for connection-level
    /// storage failures; everything else is reported as an outcome.
    pub async fn process_message(&mut self, raw: &[u8]) -> Result<MessageOutcome> {
        self.state = IngestionState::Processing;
        MESSAGES_CONSUMED.inc();

        let event = match decoder::decode(raw) {
            Ok(Decoded::Trade(event)) => event,
            Ok(Decoded::Ignored { kind }) => {
                MESSAGES_IGNORED.inc();
                tracing::debug!(kind = %kind, "Skipping message kind");
                return Ok(MessageOutcome::Ignored { kind });
            }
            Err(e) => {
                self.state = IngestionState::ErrorLogged;
                DECODE_FAILURES.inc();
                tracing::warn!(reason = %e.reason, payload = %e.raw, "Dropping malformed message");
                self.publish_dead_letter(DeadLetter::new(DeadLetterReason::Decode, &e.reason, raw, 0))
                    .await;
                return Ok(MessageOutcome::Rejected { reason: e.reason });
            }
        };

        self.persist(raw, &event).await
    }

    async fn persist(&mut self, raw: &[u8], event: &TradeEvent) -> Result<MessageOutcome> {
        let time = match event.time() {
            Some(time) => time,
            None => {
                // Decoder already range-checks; kept so a bad instant can never reach the store.
                self.state = IngestionState::ErrorLogged;
                let reason = format!("timestamp out of range: {}", event.timestamp);
                tracing::warn!(reason = %reason, "Dropping malformed message");
                self.publish_dead_letter(DeadLetter::new(DeadLetterReason::Decode, &reason, raw, 0))
                    .await;
                return Ok(MessageOutcome::Rejected { reason });
            }
        };
        let row = PriceRow::from_event(event, time);

        let mut attempt = 0;
        loop {
            attempt += 1;

            let timer = INSERT_LATENCY.start_timer();
            let result = self.store.insert_price(&row).await;
            timer.observe_duration();

            match result {
                Ok(()) => {
                    TRADES_PERSISTED.inc();
                    tracing::debug!(price = row.price, time = %row.time, attempt, "Trade data added");
                    return Ok(MessageOutcome::Persisted);
                }
                Err(e) if e.is_connection() => {
                    tracing::error!(
                        error = %e,
                        payload = %String::from_utf8_lossy(raw),
                        "Storage connection lost, halting ingestion"
                    );
                    return Err(Error::Storage(e));
                }
                Err(e) if e.is_transient() && attempt < self.policy.max_attempts => {
                    PERSIST_RETRIES.inc();
                    let delay = self.policy.backoff(attempt);
                    tracing::warn!(
                        error = %e,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Transient storage error, retrying insert"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    self.state = IngestionState::ErrorLogged;
                    PERSIST_FAILURES.inc();
                    tracing::error!(
                        error = %e,
                        code = ?e.code,
                        payload = %String::from_utf8_lossy(raw),
                        timestamp = %row.time,
                        price = row.price,
                        attempts = attempt,
                        "Error in trade processing"
                    );

                    let reason = if e.is_transient() {
                        DeadLetterReason::RetriesExhausted
                    } else {
                        DeadLetterReason::Constraint
                    };
                    self.publish_dead_letter(DeadLetter::new(reason, &e, raw, attempt)).await;
                    return Ok(MessageOutcome::Dropped { error: e, attempts: attempt });
                }
            }
        }
    }

    async fn publish_dead_letter(&self, letter: DeadLetter) {
        let Some(sink) = &self.dead_letter else {
            return;
        };

        match sink.publish(&letter).await {
            Ok(()) => {
                DEAD_LETTERED.inc();
                tracing::info!(reason = ?letter.reason, "Message moved to dead-letter channel");
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    reason = ?letter.reason,
                    payload = %letter.payload,
                    "Failed to dead-letter message"
                );
            }
        }
    }
}
