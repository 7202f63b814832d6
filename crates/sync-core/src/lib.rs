//! Core types for attendance-sync.
//!
//! This crate holds everything the replication loop needs that is not tied
//! to a particular database:
//!
//! - [`LogRecord`], [`Watermark`], [`Batch`] - the data model
//! - [`LogSource`] / [`LogSink`] - traits implemented by the store crates
//! - [`StoreError`] / [`CycleError`] - the error taxonomy
//! - [`Replicator`] - the watermark, fetch, insert cycle and its loop
//!
//! # Architecture
//!
//! ```text
//! sync-core (this crate)
//!    │
//!    ├─── attendance-sync-mssql-source      (LogSource for SQL Server)
//!    ├─── attendance-sync-postgresql-sink   (LogSink for PostgreSQL)
//!    └─── attendance-sync                   (CLI wiring)
//! ```
//!
//! # Example
//!
//! ```rust
//! use sync_core::testing::{sample_record, MemorySink, MemorySource};
//! use sync_core::{Replicator, ReplicatorConfig};
//!
//! # tokio_test::block_on(async {
//! let source = MemorySource::with_records((1..=3).map(sample_record));
//! let sink = MemorySink::new();
//! let mut replicator = Replicator::new(source, sink.clone(), ReplicatorConfig::default());
//!
//! let outcome = replicator.run_cycle().await.unwrap();
//! assert_eq!(outcome.inserted(), 3);
//! assert_eq!(sink.ids(), vec![1, 2, 3]);
//! # });
//! ```

pub mod error;
pub mod record;
pub mod replicator;
pub mod store;
pub mod testing;

// Re-exports for convenience
pub use error::{BoxError, CycleError, Stage, StoreError};
pub use record::{Batch, LogRecord, Watermark};
pub use replicator::{
    CycleOutcome, CyclePhase, Replicator, ReplicatorConfig, RunSummary, DEFAULT_BATCH_SIZE,
    DEFAULT_INTERVAL, DEFAULT_STORE_TIMEOUT,
};
pub use store::{LogSink, LogSource};
