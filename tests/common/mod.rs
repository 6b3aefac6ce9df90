#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use trade_ingest::core::diagnostic::DiagnosticRecord;
use trade_ingest::error::{Error, Result, StorageError, StorageErrorKind, StorageResult};
use trade_ingest::events::dead_letter::DeadLetter;
use trade_ingest::events::trade::PriceRow;
use trade_ingest::interfaces::dead_letter_sink::DeadLetterSink;
use trade_ingest::interfaces::diagnostic_probe::DiagnosticProbe;
use trade_ingest::interfaces::message_source::MessageSource;
use trade_ingest::interfaces::price_store::PriceStore;
use trade_ingest::interfaces::view_refresher::ViewRefresher;
use trade_ingest::storage::schema::Granularity;

pub fn trade_payload(price: f64, timestamp: i64) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "type": "TRADE_ADDED",
        "data": { "price": price, "timestamp": timestamp },
    }))
    .unwrap()
}

pub fn storage_error(kind: StorageErrorKind, code: &str) -> StorageError {
    StorageError::new(kind, format!("injected {}", code)).with_code(code)
}

/// Hands out a fixed list of payloads. Once drained it either reports the
/// queue as gone or blocks forever.
pub struct ScriptedSource {
    messages: VecDeque<Vec<u8>>,
    block_when_drained: bool,
}

impl ScriptedSource {
    pub fn new(messages: Vec<Vec<u8>>) -> Self {
        ScriptedSource {
            messages: messages.into(),
            block_when_drained: false,
        }
    }

    pub fn blocking(messages: Vec<Vec<u8>>) -> Self {
        ScriptedSource {
            messages: messages.into(),
            block_when_drained: true,
        }
    }
}

#[async_trait]
impl MessageSource for ScriptedSource {
    async fn pop(&mut self) -> Result<Vec<u8>> {
        match self.messages.pop_front() {
            Some(raw) => Ok(raw),
            None if self.block_when_drained => std::future::pending().await,
            None => Err(Error::Queue("queue connection closed".to_string())),
        }
    }
}

/// In-memory `tata_prices`. Queued failures are returned before any row is
/// accepted, one per insert.
#[derive(Default)]
pub struct MemoryPriceStore {
    rows: Mutex<Vec<PriceRow>>,
    failures: Mutex<VecDeque<StorageError>>,
    attempts: AtomicU32,
}

impl MemoryPriceStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_next(&self, err: StorageError) {
        self.failures.lock().unwrap().push_back(err);
    }

    pub fn rows(&self) -> Vec<PriceRow> {
        self.rows.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceStore for MemoryPriceStore {
    async fn insert_price(&self, row: &PriceRow) -> StorageResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        self.rows.lock().unwrap().push(row.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryDeadLetter {
    letters: Mutex<Vec<DeadLetter>>,
}

impl MemoryDeadLetter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn letters(&self) -> Vec<DeadLetter> {
        self.letters.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeadLetterSink for MemoryDeadLetter {
    async fn publish(&self, letter: &DeadLetter) -> Result<()> {
        self.letters.lock().unwrap().push(letter.clone());
        Ok(())
    }
}

/// Dead-letter channel that is always unreachable.
#[derive(Default)]
pub struct FailingDeadLetter {
    publishes: AtomicU32,
}

impl FailingDeadLetter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn publishes(&self) -> u32 {
        self.publishes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeadLetterSink for FailingDeadLetter {
    async fn publish(&self, _letter: &DeadLetter) -> Result<()> {
        self.publishes.fetch_add(1, Ordering::SeqCst);
        Err(Error::Queue("dead-letter channel unreachable".to_string()))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Candle {
    pub bucket: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// Recomputes OHLC candles from a shared row set, the way a materialized view
/// refresh does.
pub struct FakeRefresher {
    prices: Arc<MemoryPriceStore>,
    views: Mutex<HashMap<Granularity, Vec<Candle>>>,
    calls: Mutex<Vec<Granularity>>,
    failures: Mutex<HashMap<Granularity, StorageError>>,
}

impl FakeRefresher {
    pub fn new(prices: Arc<MemoryPriceStore>) -> Arc<Self> {
        Arc::new(FakeRefresher {
            prices,
            views: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
        })
    }

    /// Fails the next refresh of `granularity` only.
    pub fn fail_once(&self, granularity: Granularity, err: StorageError) {
        self.failures.lock().unwrap().insert(granularity, err);
    }

    pub fn calls(&self) -> Vec<Granularity> {
        self.calls.lock().unwrap().clone()
    }

    pub fn view(&self, granularity: Granularity) -> Vec<Candle> {
        self.views.lock().unwrap().get(&granularity).cloned().unwrap_or_default()
    }
}

fn bucket_secs(granularity: Granularity) -> i64 {
    match granularity {
        Granularity::OneMinute => 60,
        Granularity::OneHour => 3_600,
        Granularity::OneWeek => 604_800,
    }
}

fn rollup(rows: &[PriceRow], granularity: Granularity) -> Vec<Candle> {
    let width = bucket_secs(granularity);
    let mut sorted = rows.to_vec();
    sorted.sort_by_key(|row| row.time);

    let mut candles: Vec<Candle> = Vec::new();
    for row in sorted {
        let start = row.time.timestamp().div_euclid(width) * width;
        let bucket = Utc.timestamp_opt(start, 0).unwrap();
        match candles.last_mut() {
            Some(candle) if candle.bucket == bucket => {
                candle.high = candle.high.max(row.price);
                candle.low = candle.low.min(row.price);
                candle.close = row.price;
            }
            _ => candles.push(Candle {
                bucket,
                open: row.price,
                high: row.price,
                low: row.price,
                close: row.price,
            }),
        }
    }
    candles
}

#[async_trait]
impl ViewRefresher for FakeRefresher {
    async fn refresh_view(&self, granularity: Granularity) -> StorageResult<()> {
        self.calls.lock().unwrap().push(granularity);
        if let Some(err) = self.failures.lock().unwrap().remove(&granularity) {
            return Err(err);
        }
        let candles = rollup(&self.prices.rows(), granularity);
        self.views.lock().unwrap().insert(granularity, candles);
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProbeStep {
    Connect,
    CreateTable,
    Write,
    Read,
    Transaction,
}

/// Probe that succeeds until the configured step, and records whether
/// cleanup ran.
pub struct FakeProbe {
    fail_at: Option<(ProbeStep, StorageError)>,
    rows: Vec<DiagnosticRecord>,
    pub cleaned_up: Arc<AtomicBool>,
}

impl FakeProbe {
    pub fn healthy() -> Self {
        FakeProbe {
            fail_at: None,
            rows: Vec::new(),
            cleaned_up: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn failing_at(step: ProbeStep, err: StorageError) -> Self {
        FakeProbe {
            fail_at: Some((step, err)),
            ..Self::healthy()
        }
    }

    fn check(&mut self, step: ProbeStep) -> StorageResult<()> {
        match &self.fail_at {
            Some((at, err)) if *at == step => Err(err.clone()),
            _ => Ok(()),
        }
    }

    fn insert(&mut self, test_data: &str) {
        let id = self.rows.len() as i32 + 1;
        self.rows.push(DiagnosticRecord {
            id,
            test_data: test_data.to_string(),
            created_at: Utc.timestamp_opt(1_700_000_000 + id as i64, 0).unwrap(),
        });
    }
}

#[async_trait]
impl DiagnosticProbe for FakeProbe {
    async fn connect(&mut self) -> StorageResult<()> {
        self.check(ProbeStep::Connect)
    }

    async fn create_scratch_table(&mut self) -> StorageResult<()> {
        self.check(ProbeStep::CreateTable)
    }

    async fn write_row(&mut self, test_data: &str) -> StorageResult<()> {
        self.check(ProbeStep::Write)?;
        self.insert(test_data);
        Ok(())
    }

    async fn read_latest(&mut self) -> StorageResult<DiagnosticRecord> {
        self.check(ProbeStep::Read)?;
        self.rows.last().cloned().ok_or_else(|| {
            StorageError::new(StorageErrorKind::Constraint, "no rows returned")
        })
    }

    async fn transacted_write(&mut self, test_data: &str) -> StorageResult<()> {
        self.check(ProbeStep::Transaction)?;
        self.insert(test_data);
        Ok(())
    }

    async fn cleanup(&mut self) {
        self.rows.clear();
        self.cleaned_up.store(true, Ordering::SeqCst);
    }
}
