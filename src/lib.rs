//! attendance-sync library
//!
//! Keeps a PostgreSQL copy of the attendance device log table that lives in
//! SQL Server, and runs the periodic maintenance commands that go with it.
//!
//! # Crates
//!
//! - `sync_core` - record types, store traits and the replication cycle
//! - `attendance_sync_mssql_source` - SQL Server `LogSource`
//! - `attendance_sync_postgresql_sink` - PostgreSQL `LogSink`
//!
//! # CLI Usage
//!
//! ```bash
//! # Replicate continuously (Ctrl+C / SIGTERM stops after the current cycle)
//! attendance-sync replicate \
//!   --source-connection-string "server=tcp:127.0.0.1,1433;user id=sync;password=...;database=biotime" \
//!   --destination-connection-string "host=10.0.0.5 user=postgres password=... dbname=casa"
//!
//! # One cycle, then exit (non-zero when the cycle fails)
//! attendance-sync once --source-connection-string ... --destination-connection-string ...
//!
//! # Print the destination watermark
//! attendance-sync watermark --destination-connection-string ...
//!
//! # Run maintenance commands every interval
//! attendance-sync maintenance --config maintenance.toml
//! ```

use std::num::NonZeroUsize;
use std::time::Duration;

use clap::Parser;
use sync_core::ReplicatorConfig;

pub mod config;
pub mod maintenance;
pub mod replicate;
pub mod shutdown;

pub use attendance_sync_mssql_source as mssql;
pub use attendance_sync_postgresql_sink as postgresql;

#[derive(Parser, Clone, Debug)]
pub struct SourceOpts {
    /// SQL Server ADO.NET connection string
    #[arg(long, env = "SOURCE_CONNECTION_STRING", hide_env_values = true)]
    pub source_connection_string: String,

    /// SQL Server table holding the device logs
    #[arg(long, default_value = mssql::DEFAULT_TABLE, env = "SOURCE_TABLE")]
    pub source_table: String,
}

#[derive(Parser, Clone, Debug)]
pub struct DestinationOpts {
    /// PostgreSQL connection string (key=value or postgresql:// URL)
    #[arg(long, env = "DESTINATION_CONNECTION_STRING", hide_env_values = true)]
    pub destination_connection_string: String,

    /// PostgreSQL table receiving the logs
    #[arg(long, default_value = postgresql::DEFAULT_TABLE, env = "DESTINATION_TABLE")]
    pub destination_table: String,

    /// Create the destination table on startup if it is missing
    #[arg(long)]
    pub create_table: bool,
}

#[derive(Parser, Clone, Debug)]
pub struct ReplicationOpts {
    /// Delay between cycles (e.g. "10s", "1m", "300")
    #[arg(long, default_value = "10s", value_parser = config::parse_duration)]
    pub interval: Duration,

    /// Maximum records fetched per cycle; 0 fetches every pending record
    #[arg(long, default_value_t = sync_core::DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Limit for each store operation; 0 disables the limit
    #[arg(long, default_value = "60s", value_parser = config::parse_duration)]
    pub store_timeout: Duration,
}

impl From<&SourceOpts> for mssql::SourceOpts {
    fn from(opts: &SourceOpts) -> Self {
        Self {
            connection_string: opts.source_connection_string.clone(),
            table: opts.source_table.clone(),
        }
    }
}

impl From<&DestinationOpts> for postgresql::SinkOpts {
    fn from(opts: &DestinationOpts) -> Self {
        Self {
            connection_string: opts.destination_connection_string.clone(),
            table: opts.destination_table.clone(),
        }
    }
}

impl From<&ReplicationOpts> for ReplicatorConfig {
    fn from(opts: &ReplicationOpts) -> Self {
        Self {
            interval: opts.interval,
            batch_size: NonZeroUsize::new(opts.batch_size),
            store_timeout: Some(opts.store_timeout).filter(|d| !d.is_zero()),
        }
    }
}
