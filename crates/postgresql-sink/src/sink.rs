//! `LogSink` implementation writing to a PostgreSQL `logs` table.

use anyhow::Result;
use async_trait::async_trait;
use sync_core::{LogRecord, LogSink, StoreError, Watermark};
use tokio_postgres::types::ToSql;
use tracing::{debug, info, warn};

use crate::client::{classify, connect, sanitize_connection_string};
use crate::statement::{
    create_table_statement, insert_statement, quote_table, watermark_query, INSERT_CHUNK_SIZE,
};
use crate::SinkOpts;

/// Writes replicated rows into PostgreSQL, one transaction per batch.
pub struct PostgresSink {
    connection_string: String,
    table: String,
}

impl PostgresSink {
    pub fn new(opts: &SinkOpts) -> Result<Self> {
        Ok(Self {
            connection_string: opts.connection_string.clone(),
            table: quote_table(&opts.table)?,
        })
    }

    /// Quoted table name the sink writes to
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Create the destination table if it does not exist yet.
    pub async fn ensure_table(&self) -> Result<(), StoreError> {
        let client = connect(&self.connection_string).await?;
        client
            .batch_execute(&create_table_statement(&self.table))
            .await
            .map_err(|e| classify(&format!("Failed to create table {}", self.table), e))?;
        info!(
            "Ensured destination table {} exists ({})",
            self.table,
            sanitize_connection_string(&self.connection_string)
        );
        Ok(())
    }
}

#[async_trait]
impl LogSink for PostgresSink {
    fn sink_type(&self) -> &'static str {
        "postgresql"
    }

    async fn watermark(&self) -> Result<Watermark, StoreError> {
        let client = connect(&self.connection_string).await?;
        let row = client
            .query_one(watermark_query(&self.table).as_str(), &[])
            .await
            .map_err(|e| classify("Failed to read destination watermark", e))?;
        let max_id: i64 = row
            .try_get(0)
            .map_err(|e| classify("Failed to decode destination watermark", e))?;
        Ok(Watermark::new(max_id))
    }

    async fn insert_batch(&self, records: &[LogRecord]) -> Result<u64, StoreError> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut client = connect(&self.connection_string).await?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| classify("Failed to begin transaction", e))?;

        let mut inserted = 0u64;
        for chunk in records.chunks(INSERT_CHUNK_SIZE) {
            let sql = insert_statement(&self.table, chunk.len());
            let params = chunk_params(chunk);
            match tx.execute(sql.as_str(), &params).await {
                Ok(rows) => {
                    inserted += rows;
                    debug!("Inserted chunk of {} rows into {}", rows, self.table);
                }
                Err(e) => {
                    let err = classify(&format!("Failed to insert into {}", self.table), e);
                    if let Err(rollback_err) = tx.rollback().await {
                        warn!("Rollback after failed insert also failed: {rollback_err}");
                    }
                    return Err(err);
                }
            }
        }

        tx.commit()
            .await
            .map_err(|e| classify("Failed to commit transaction", e))?;
        Ok(inserted)
    }
}

fn chunk_params(chunk: &[LogRecord]) -> Vec<&(dyn ToSql + Sync)> {
    let mut params: Vec<&(dyn ToSql + Sync)> = Vec::with_capacity(chunk.len() * 6);
    for record in chunk {
        params.push(&record.id);
        params.push(&record.employee_id);
        params.push(&record.direction);
        params.push(&record.short_name);
        params.push(&record.serial_no);
        params.push(&record.log_datetime);
    }
    params
}
