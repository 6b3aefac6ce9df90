use chrono::DateTime;
use serde::Deserialize;
use serde_json::{Map, Value};
use crate::error::DecodeError;
use crate::events::trade::{Decoded, TradeEvent, TRADE_ADDED};

/// Width of `tata_prices.currency_code`.
pub const MAX_CURRENCY_CODE_LEN: usize = 10;

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

/// Parses one queue payload.
///
/// Unknown `type` values decode to [`Decoded::Ignored`] without looking at
/// `data`, so publishers can add message types before this consumer learns them.
pub fn decode(raw: &[u8]) -> Result<Decoded, DecodeError> {
    let text = std::str::from_utf8(raw)
        .map_err(|e| DecodeError::new(format!("payload is not UTF-8: {}", e), raw))?;

    let envelope: Envelope = serde_json::from_str(text)
        .map_err(|e| DecodeError::new(format!("invalid envelope: {}", e), raw))?;

    if envelope.kind != TRADE_ADDED {
        return Ok(Decoded::Ignored { kind: envelope.kind });
    }

    let data = envelope.data.as_object()
        .ok_or_else(|| DecodeError::new("data must be an object", raw))?;

    let event = decode_trade(data).map_err(|reason| DecodeError::new(reason, raw))?;
    Ok(Decoded::Trade(event))
}

fn decode_trade(data: &Map<String, Value>) -> Result<TradeEvent, String> {
    let price = match data.get("price") {
        None | Some(Value::Null) => return Err("missing price".to_string()),
        Some(value) => finite_number(value, "price")?,
    };

    let timestamp = match data.get("timestamp") {
        None | Some(Value::Null) => return Err("missing timestamp".to_string()),
        Some(value) => epoch_millis(value)?,
    };

    let volume = match data.get("volume") {
        None | Some(Value::Null) => None,
        Some(value) => Some(finite_number(value, "volume")?),
    };

    let currency_code = match data.get("currencyCode") {
        None | Some(Value::Null) => None,
        Some(Value::String(code)) if code.chars().count() <= MAX_CURRENCY_CODE_LEN => Some(code.clone()),
        Some(Value::String(code)) => {
            return Err(format!(
                "currencyCode longer than {} characters: {:?}",
                MAX_CURRENCY_CODE_LEN, code
            ))
        }
        Some(other) => return Err(format!("currencyCode must be a string, got {}", other)),
    };

    Ok(TradeEvent {
        price,
        timestamp,
        volume,
        currency_code,
    })
}

fn finite_number(value: &Value, field: &str) -> Result<f64, String> {
    match value.as_f64() {
        Some(n) if n.is_finite() => Ok(n),
        Some(n) => Err(format!("{} is not finite: {}", field, n)),
        None => Err(format!("{} must be a number, got {}", field, value)),
    }
}

/// Epoch milliseconds that map to a representable UTC instant. Fractional
/// values truncate toward zero.
fn epoch_millis(value: &Value) -> Result<i64, String> {
    let millis = match value {
        Value::Number(n) => match n.as_i64() {
            Some(ms) => ms,
            None => n.as_f64()
                .map(f64::trunc)
                .filter(|ms| ms.is_finite() && ms.abs() < i64::MAX as f64)
                .map(|ms| ms as i64)
                .ok_or_else(|| format!("timestamp out of range: {}", n))?,
        },
        other => return Err(format!("timestamp must be a number, got {}", other)),
    };

    if DateTime::from_timestamp_millis(millis).is_none() {
        return Err(format!("timestamp out of range: {}", millis));
    }
    Ok(millis)
}
