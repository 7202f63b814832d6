//! PostgreSQL log sink for attendance-sync
//!
//! The destination table is the durable state of the replication: its
//! `max(id)` is the watermark and its primary key rejects a batch that was
//! already committed. Each batch is written with multi-row INSERTs inside a
//! single transaction.

mod client;
mod sink;
mod statement;

pub use client::{
    classify, connect, format_pg_error, is_constraint_sqlstate, sanitize_connection_string,
};
pub use sink::PostgresSink;
pub use statement::{
    create_table_statement, insert_statement, quote_table, watermark_query, DEFAULT_TABLE,
    INSERT_CHUNK_SIZE,
};

/// PostgreSQL destination connection options
#[derive(Clone, Debug)]
pub struct SinkOpts {
    /// libpq-style connection string or `postgresql://` URL
    pub connection_string: String,
    /// Destination table (`schema.table`)
    pub table: String,
}
