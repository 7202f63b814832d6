//! Record, watermark and batch types shared by every store.

use chrono::NaiveDateTime;
use std::fmt;

/// One attendance log row.
///
/// `id` is assigned by the source and identifies the row in both stores.
/// Once a record lands in the destination it is never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Source-assigned identifier, unique across the table
    pub id: i64,
    /// Employee the punch belongs to; some devices log punches without one
    pub employee_id: Option<String>,
    /// Punch direction as reported by the device (e.g. "in" / "out")
    pub direction: Option<String>,
    /// Short name of the device or location
    pub short_name: Option<String>,
    /// Serial number of the recording device
    pub serial_no: Option<String>,
    /// Local time of the punch
    pub log_datetime: Option<NaiveDateTime>,
}

impl LogRecord {
    /// Create a record for `employee_id`, leaving the device fields unset.
    pub fn new(id: i64, employee_id: impl Into<String>) -> Self {
        Self {
            id,
            employee_id: Some(employee_id.into()),
            direction: None,
            short_name: None,
            serial_no: None,
            log_datetime: None,
        }
    }
}

/// The highest record identifier already present in the destination.
///
/// The watermark is always rederived from the destination and never carried
/// between cycles. An empty destination has watermark 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Watermark(i64);

impl Watermark {
    pub const ZERO: Watermark = Watermark(0);

    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// Whether a record with this id lies strictly above the watermark.
    pub fn admits(&self, id: i64) -> bool {
        id > self.0
    }

    /// Derive a watermark from the ids present in a store.
    pub fn from_ids<I: IntoIterator<Item = i64>>(ids: I) -> Self {
        ids.into_iter().max().map(Self).unwrap_or(Self::ZERO)
    }
}

impl From<i64> for Watermark {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Records fetched in one cycle, all newer than the cycle's watermark.
///
/// Source order is preserved; ids are not assumed to be ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    watermark: Watermark,
    records: Vec<LogRecord>,
}

impl Batch {
    /// Build a batch, keeping only records above `watermark`.
    ///
    /// Returns the batch and the number of records that were discarded.
    pub fn above(watermark: Watermark, records: Vec<LogRecord>) -> (Self, usize) {
        let total = records.len();
        let records: Vec<LogRecord> = records
            .into_iter()
            .filter(|r| watermark.admits(r.id))
            .collect();
        let discarded = total - records.len();
        (Self { watermark, records }, discarded)
    }

    pub fn empty(watermark: Watermark) -> Self {
        Self {
            watermark,
            records: Vec::new(),
        }
    }

    /// Watermark the batch was fetched against.
    pub fn watermark(&self) -> Watermark {
        self.watermark
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Largest id in the batch, if any.
    pub fn max_id(&self) -> Option<i64> {
        self.records.iter().map(|r| r.id).max()
    }

    pub fn ids(&self) -> Vec<i64> {
        self.records.iter().map(|r| r.id).collect()
    }
}
