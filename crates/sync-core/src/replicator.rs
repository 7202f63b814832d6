//! Incremental replication from a [`LogSource`] into a [`LogSink`].
//!
//! Each cycle reads the watermark from the destination, fetches every source
//! record above it and writes the batch in one transaction:
//!
//! ```text
//! Idle -> ReadingWatermark -> Fetching -> Inserting -> Done
//!               \                 \            \
//!                +-----------------+------------+--> Failed
//! ```
//!
//! Nothing is carried between cycles. After a crash or restart the next
//! cycle rederives the watermark from durable state and continues where the
//! destination left off. A batch that raced an earlier commit fails on the
//! destination's unique key and is rolled back whole.
//!
//! The loop in [`Replicator::run`] never exits on a failed cycle: the error
//! is logged with its stage and the next cycle starts after the usual delay.

use std::future::Future;
use std::num::NonZeroUsize;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;
use tracing::{debug, error, info, warn};

use crate::error::{CycleError, Stage, StoreError};
use crate::record::{Batch, Watermark};
use crate::store::{LogSink, LogSource};

/// Default delay between cycles
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

/// Default page size for a single fetch
pub const DEFAULT_BATCH_SIZE: usize = 5000;

/// Default limit for each store operation
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(60);

/// Settings for the replication loop
#[derive(Debug, Clone)]
pub struct ReplicatorConfig {
    /// Delay between the end of one cycle and the start of the next
    pub interval: Duration,
    /// Maximum records fetched per cycle (`None` fetches everything)
    pub batch_size: Option<NonZeroUsize>,
    /// Limit applied to each store operation (`None` waits forever)
    pub store_timeout: Option<Duration>,
}

impl Default for ReplicatorConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            batch_size: NonZeroUsize::new(DEFAULT_BATCH_SIZE),
            store_timeout: Some(DEFAULT_STORE_TIMEOUT),
        }
    }
}

/// Where the replicator is within the current cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    ReadingWatermark,
    Fetching,
    Inserting,
    Done,
    Failed,
}

/// Result of a successful cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing newer than the watermark
    Empty { watermark: Watermark },
    /// A batch was committed
    Applied {
        watermark: Watermark,
        inserted: u64,
        /// The fetch filled a whole page, so more records are likely waiting
        page_full: bool,
    },
}

impl CycleOutcome {
    pub fn inserted(&self) -> u64 {
        match self {
            CycleOutcome::Empty { .. } => 0,
            CycleOutcome::Applied { inserted, .. } => *inserted,
        }
    }

    /// Whether the loop should skip the delay and run again immediately.
    pub fn has_backlog(&self) -> bool {
        matches!(
            self,
            CycleOutcome::Applied {
                page_full: true,
                ..
            }
        )
    }
}

/// Totals reported when the loop stops
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: u64,
    pub failed_cycles: u64,
    pub inserted: u64,
}

/// Drives replication cycles between one source and one sink.
pub struct Replicator<S, D> {
    source: S,
    sink: D,
    config: ReplicatorConfig,
    phase: CyclePhase,
}

impl<S: LogSource, D: LogSink> Replicator<S, D> {
    pub fn new(source: S, sink: D, config: ReplicatorConfig) -> Self {
        Self {
            source,
            sink,
            config,
            phase: CyclePhase::Idle,
        }
    }

    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    pub fn config(&self) -> &ReplicatorConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn sink(&self) -> &D {
        &self.sink
    }

    /// Read the current watermark from the destination.
    pub async fn get_watermark(&self) -> Result<Watermark, StoreError> {
        self.bounded(self.sink.watermark()).await
    }

    /// Fetch the records above `watermark` from the source.
    ///
    /// Records at or below the watermark are dropped even if the source
    /// returns them.
    pub async fn fetch_new(&self, watermark: Watermark) -> Result<Batch, StoreError> {
        let records = self
            .bounded(self.source.fetch_after(watermark, self.config.batch_size))
            .await?;
        let (batch, discarded) = Batch::above(watermark, records);
        if discarded > 0 {
            warn!(
                "{} source returned {} records at or below watermark {}, discarding them",
                self.source.source_type(),
                discarded,
                watermark
            );
        }
        debug!(
            "Fetched {} records above watermark {}",
            batch.len(),
            watermark
        );
        Ok(batch)
    }

    /// Write a batch to the destination as one atomic unit.
    ///
    /// An empty batch is a successful no-op and leaves the destination
    /// untouched.
    pub async fn apply_batch(&self, batch: &Batch) -> Result<u64, StoreError> {
        if batch.is_empty() {
            info!(
                "No new records to insert (watermark {})",
                batch.watermark()
            );
            return Ok(0);
        }
        self.bounded(self.sink.insert_batch(batch.records())).await
    }

    /// Run one full cycle.
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome, CycleError> {
        let result = self.cycle_steps().await;
        self.phase = match result {
            Ok(_) => CyclePhase::Done,
            Err(_) => CyclePhase::Failed,
        };
        result
    }

    async fn cycle_steps(&mut self) -> Result<CycleOutcome, CycleError> {
        self.phase = CyclePhase::ReadingWatermark;
        let watermark = self
            .get_watermark()
            .await
            .map_err(|e| CycleError::new(Stage::WatermarkRead, e))?;

        self.phase = CyclePhase::Fetching;
        let batch = self
            .fetch_new(watermark)
            .await
            .map_err(|e| CycleError::new(Stage::Fetch, e))?;

        self.phase = CyclePhase::Inserting;
        let inserted = self
            .apply_batch(&batch)
            .await
            .map_err(|e| CycleError::new(Stage::Insert, e))?;

        if batch.is_empty() {
            return Ok(CycleOutcome::Empty { watermark });
        }

        let page_full = self
            .config
            .batch_size
            .is_some_and(|limit| batch.len() >= limit.get());

        info!(
            "Inserted {} new records into {} (watermark {} -> {})",
            inserted,
            self.sink.sink_type(),
            watermark,
            batch.max_id().unwrap_or(watermark.value())
        );

        Ok(CycleOutcome::Applied {
            watermark,
            inserted,
            page_full,
        })
    }

    /// Run cycles until `shutdown` fires.
    ///
    /// The signal is only observed between cycles, so an in-flight insert
    /// always commits or rolls back before the loop returns.
    pub async fn run(&mut self, mut shutdown: broadcast::Receiver<()>) -> RunSummary {
        let mut summary = RunSummary::default();

        info!(
            "Starting replication from {} to {} (interval {:?}, batch size {:?})",
            self.source.source_type(),
            self.sink.sink_type(),
            self.config.interval,
            self.config.batch_size
        );

        loop {
            summary.cycles += 1;
            let backlog = match self.run_cycle().await {
                Ok(outcome) => {
                    summary.inserted += outcome.inserted();
                    outcome.has_backlog()
                }
                Err(e) => {
                    summary.failed_cycles += 1;
                    error!("Replication cycle failed at {}: {}", e.stage, e.source);
                    false
                }
            };
            self.phase = CyclePhase::Idle;

            match shutdown.try_recv() {
                Err(TryRecvError::Empty) => {}
                _ => {
                    info!("Received shutdown signal");
                    break;
                }
            }

            if backlog {
                debug!("Page was full, starting next cycle immediately");
                continue;
            }

            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Received shutdown signal");
                    break;
                }
                _ = tokio::time::sleep(self.config.interval) => {}
            }
        }

        info!(
            "Replication stopped after {} cycles ({} failed), {} records inserted",
            summary.cycles, summary.failed_cycles, summary.inserted
        );
        summary
    }

    async fn bounded<T, F>(&self, operation: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match self.config.store_timeout {
            Some(limit) => tokio::time::timeout(limit, operation)
                .await
                .map_err(|_| StoreError::Timeout(limit))?,
            None => operation.await,
        }
    }
}
