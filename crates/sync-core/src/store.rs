//! Store traits implemented by the database crates.
//!
//! The replicator only talks to stores through these traits, so the SQL
//! Server source and PostgreSQL sink live in their own crates and tests can
//! substitute the in-memory stores from [`crate::testing`].

use std::num::NonZeroUsize;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::record::{LogRecord, Watermark};

/// Read side: the store that owns record creation.
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Source type identifier used in log lines
    fn source_type(&self) -> &'static str;

    /// Fetch records with `id > watermark`.
    ///
    /// Without a limit every matching row is returned in the order the store
    /// yields them. With a limit the store returns at most `limit` rows,
    /// lowest ids first, so that consecutive pages never skip a record.
    async fn fetch_after(
        &self,
        watermark: Watermark,
        limit: Option<NonZeroUsize>,
    ) -> Result<Vec<LogRecord>, StoreError>;
}

/// Write side: the store holding the replicated copy.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Sink type identifier used in log lines
    fn sink_type(&self) -> &'static str;

    /// `max(id)` over the stored rows, 0 when empty.
    async fn watermark(&self) -> Result<Watermark, StoreError>;

    /// Insert all records in one transaction.
    ///
    /// Either every record is committed or none is. Returns the number of
    /// rows written.
    async fn insert_batch(&self, records: &[LogRecord]) -> Result<u64, StoreError>;
}
