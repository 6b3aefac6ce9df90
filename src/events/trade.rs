use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const TRADE_ADDED: &str = "TRADE_ADDED";

/// A decoded `TRADE_ADDED` message. Immutable once decoded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    pub price: f64,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub volume: Option<f64>,
    pub currency_code: Option<String>,
}

impl TradeEvent {
    pub fn time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }
}

/// Outcome of decoding one queue payload.
#[derive(Clone, Debug, PartialEq)]
pub enum Decoded {
    Trade(TradeEvent),
    /// A well-formed envelope whose `type` this consumer does not persist.
    Ignored { kind: String },
}

/// One row of `tata_prices`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceRow {
    pub time: DateTime<Utc>,
    pub price: f64,
    pub volume: Option<f64>,
    pub currency_code: Option<String>,
}

impl PriceRow {
    pub fn from_event(event: &TradeEvent, time: DateTime<Utc>) -> Self {
        PriceRow {
            time,
            price: event.price,
            volume: event.volume,
            currency_code: event.currency_code.clone(),
        }
    }
}
