//! SQL Server log source for attendance-sync
//!
//! Reads the attendance device log table (`[dbo].[logs]` by default) with a
//! single parameterized range query per cycle: every row whose `id` is above
//! the destination's watermark, optionally limited to one page.

mod client;
mod query;
mod source;

pub use client::{connect, parse_connection_string, sanitize_connection_string, MssqlClient};
pub use query::{fetch_query, quote_table, DEFAULT_TABLE};
pub use source::MssqlSource;

/// SQL Server source connection options
#[derive(Clone, Debug)]
pub struct SourceOpts {
    /// ADO.NET connection string
    pub connection_string: String,
    /// Table holding the device logs (`schema.table`)
    pub table: String,
}
