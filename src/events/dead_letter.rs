use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadLetterReason {
    /// Payload never decoded. Redelivery will not help.
    Decode,
    /// Store rejected the row.
    Constraint,
    /// Transient failures outlasted the retry budget.
    RetriesExhausted,
}

/// Record pushed to the dead-letter channel for later inspection or replay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeadLetter {
    pub reason: DeadLetterReason,
    pub error: String,
    /// Original payload, lossy UTF-8.
    pub payload: String,
    pub failed_at: DateTime<Utc>,
    pub attempts: u32,
}

impl DeadLetter {
    pub fn new(reason: DeadLetterReason, error: impl ToString, payload: &[u8], attempts: u32) -> Self {
        DeadLetter {
            reason,
            error: error.to_string(),
            payload: String::from_utf8_lossy(payload).into_owned(),
            failed_at: Utc::now(),
            attempts,
        }
    }
}
