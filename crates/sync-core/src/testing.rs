//! In-memory stores for exercising the replicator without databases.
//!
//! Both stores are cheap to clone and clones share state, so a test can
//! hand one clone to a [`crate::Replicator`] and inspect the other.

use std::collections::{BTreeMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::record::{LogRecord, Watermark};
use crate::store::{LogSink, LogSource};

/// Record with plausible field values, for fixtures.
pub fn sample_record(id: i64) -> LogRecord {
    let log_datetime = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_opt(8, 0, 0))
        .map(|dt| dt + chrono::Duration::minutes(id));
    LogRecord {
        id,
        employee_id: Some(format!("EMP{:04}", id % 50)),
        direction: Some(if id % 2 == 0 { "out" } else { "in" }.to_string()),
        short_name: Some("GATE-1".to_string()),
        serial_no: Some("CQZ7224460249".to_string()),
        log_datetime,
    }
}

#[derive(Default)]
struct SourceState {
    records: Vec<LogRecord>,
    failures: usize,
    latency: Option<Duration>,
    ignore_watermark: bool,
    requests: Vec<Watermark>,
}

/// Source backed by a vector, returned in insertion order.
#[derive(Clone, Default)]
pub struct MemorySource {
    state: Arc<Mutex<SourceState>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = LogRecord>) -> Self {
        let source = Self::new();
        source.push(records);
        source
    }

    pub fn push(&self, records: impl IntoIterator<Item = LogRecord>) {
        self.lock().records.extend(records);
    }

    /// Make the next `n` fetches fail with a connection error.
    pub fn fail_next_fetches(&self, n: usize) {
        self.lock().failures = n;
    }

    /// Delay every fetch by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = Some(latency);
    }

    /// Return every record regardless of the requested watermark.
    pub fn ignore_watermark(&self) {
        self.lock().ignore_watermark = true;
    }

    /// Watermarks passed to `fetch_after`, oldest first.
    pub fn requests(&self) -> Vec<Watermark> {
        self.lock().requests.clone()
    }

    fn lock(&self) -> MutexGuard<'_, SourceState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl LogSource for MemorySource {
    fn source_type(&self) -> &'static str {
        "memory"
    }

    async fn fetch_after(
        &self,
        watermark: Watermark,
        limit: Option<NonZeroUsize>,
    ) -> Result<Vec<LogRecord>, StoreError> {
        let latency = self.lock().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.lock();
        state.requests.push(watermark);
        if state.failures > 0 {
            state.failures -= 1;
            return Err(StoreError::connection("source unreachable"));
        }

        let mut records: Vec<LogRecord> = state
            .records
            .iter()
            .filter(|r| state.ignore_watermark || watermark.admits(r.id))
            .cloned()
            .collect();

        if let Some(limit) = limit {
            records.sort_by_key(|r| r.id);
            records.truncate(limit.get());
        }
        Ok(records)
    }
}

#[derive(Default)]
struct SinkState {
    rows: BTreeMap<i64, LogRecord>,
    watermark_failures: usize,
    insert_failures: usize,
    insert_calls: usize,
}

/// Destination keyed by `id`, enforcing uniqueness like a primary key.
#[derive(Clone, Default)]
pub struct MemorySink {
    state: Arc<Mutex<SinkState>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the sink with rows that are already replicated.
    pub fn with_records(records: impl IntoIterator<Item = LogRecord>) -> Self {
        let sink = Self::new();
        {
            let mut state = sink.lock();
            for record in records {
                state.rows.insert(record.id, record);
            }
        }
        sink
    }

    pub fn ids(&self) -> Vec<i64> {
        self.lock().rows.keys().copied().collect()
    }

    pub fn get(&self, id: i64) -> Option<LogRecord> {
        self.lock().rows.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().rows.is_empty()
    }

    /// Number of non-empty batches handed to `insert_batch`.
    pub fn insert_calls(&self) -> usize {
        self.lock().insert_calls
    }

    pub fn fail_next_watermark_reads(&self, n: usize) {
        self.lock().watermark_failures = n;
    }

    pub fn fail_next_inserts(&self, n: usize) {
        self.lock().insert_failures = n;
    }

    fn lock(&self) -> MutexGuard<'_, SinkState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl LogSink for MemorySink {
    fn sink_type(&self) -> &'static str {
        "memory"
    }

    async fn watermark(&self) -> Result<Watermark, StoreError> {
        let mut state = self.lock();
        if state.watermark_failures > 0 {
            state.watermark_failures -= 1;
            return Err(StoreError::connection("destination unreachable"));
        }
        Ok(Watermark::from_ids(state.rows.keys().copied()))
    }

    async fn insert_batch(&self, records: &[LogRecord]) -> Result<u64, StoreError> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut state = self.lock();
        state.insert_calls += 1;
        if state.insert_failures > 0 {
            state.insert_failures -= 1;
            return Err(StoreError::connection("destination unreachable"));
        }

        // Validate the whole batch before touching the rows so a violation
        // leaves the sink exactly as it was.
        let mut seen: HashSet<i64> = HashSet::with_capacity(records.len());
        for record in records {
            if state.rows.contains_key(&record.id) || !seen.insert(record.id) {
                return Err(StoreError::constraint(format!(
                    "duplicate key value violates unique constraint: id={}",
                    record.id
                )));
            }
        }

        for record in records {
            state.rows.insert(record.id, record.clone());
        }
        Ok(records.len() as u64)
    }
}
