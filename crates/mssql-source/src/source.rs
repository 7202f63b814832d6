//! `LogSource` implementation reading the device log table in SQL Server.

use std::num::NonZeroUsize;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use sync_core::{LogRecord, LogSource, StoreError, Watermark};
use tiberius::{Config, Row};
use tracing::{debug, info};

use crate::client::{connect, parse_connection_string, sanitize_connection_string};
use crate::query::{fetch_query, quote_table};
use crate::SourceOpts;

/// Reads new rows from a SQL Server `logs` table.
pub struct MssqlSource {
    config: Config,
    table: String,
    display_uri: String,
}

impl MssqlSource {
    pub fn new(opts: &SourceOpts) -> Result<Self> {
        Ok(Self {
            config: parse_connection_string(&opts.connection_string)?,
            table: quote_table(&opts.table)?,
            display_uri: sanitize_connection_string(&opts.connection_string),
        })
    }

    /// Quoted table name the source reads from
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Open and close one connection to confirm the server is reachable.
    pub async fn check_connection(&self) -> Result<(), StoreError> {
        let mut client = connect(&self.config).await?;
        client
            .simple_query("SELECT 1")
            .await
            .map_err(StoreError::connection)?
            .into_results()
            .await
            .map_err(StoreError::connection)?;
        info!("SQL Server connection established ({})", self.display_uri);
        Ok(())
    }
}

#[async_trait]
impl LogSource for MssqlSource {
    fn source_type(&self) -> &'static str {
        "mssql"
    }

    async fn fetch_after(
        &self,
        watermark: Watermark,
        limit: Option<NonZeroUsize>,
    ) -> Result<Vec<LogRecord>, StoreError> {
        let mut client = connect(&self.config).await?;

        let query = fetch_query(&self.table, limit.is_some());
        let after = watermark.value();
        let rows = match limit {
            Some(limit) => {
                let top = i64::try_from(limit.get()).unwrap_or(i64::MAX);
                client.query(query.as_str(), &[&after, &top]).await
            }
            None => client.query(query.as_str(), &[&after]).await,
        }
        .map_err(StoreError::connection)?
        .into_first_result()
        .await
        .map_err(StoreError::connection)?;

        debug!(
            "SQL Server returned {} rows from {} above {}",
            rows.len(),
            self.table,
            watermark
        );

        rows.iter().map(row_to_record).collect()
    }
}

/// Convert one result row; only a NULL id marks the row malformed.
fn row_to_record(row: &Row) -> Result<LogRecord, StoreError> {
    let id: i64 = row
        .try_get("id")
        .map_err(StoreError::connection)?
        .ok_or_else(|| StoreError::connection("malformed row: NULL id"))?;

    Ok(LogRecord {
        id,
        employee_id: optional_text(row, "employeeid")?,
        direction: optional_text(row, "direction")?,
        short_name: optional_text(row, "shortname")?,
        serial_no: optional_text(row, "serialno")?,
        log_datetime: row
            .try_get::<NaiveDateTime, _>("log_datetime")
            .map_err(StoreError::connection)?,
    })
}

fn optional_text(row: &Row, column: &str) -> Result<Option<String>, StoreError> {
    Ok(row
        .try_get::<&str, _>(column)
        .map_err(StoreError::connection)?
        .map(str::to_string))
}
