//! SQL text for the destination table.

use std::fmt::Write as _;

use anyhow::{bail, Result};
use pg_escape::quote_identifier;

/// Default destination table
pub const DEFAULT_TABLE: &str = "public.logs";

/// Rows per INSERT statement. Six parameters per row keeps each statement
/// well below the 65535 bind-parameter limit.
pub const INSERT_CHUNK_SIZE: usize = 1000;

const COLUMNS: &str = "id, employeeid, direction, shortname, serialno, log_datetime";

/// Quote a possibly schema-qualified table name.
pub fn quote_table(table: &str) -> Result<String> {
    let parts: Vec<&str> = table.split('.').map(str::trim).collect();
    if parts.len() > 2 || parts.iter().any(|p| p.is_empty()) {
        bail!("Invalid PostgreSQL table name '{table}'");
    }
    Ok(parts
        .iter()
        .map(|p| quote_identifier(p).into_owned())
        .collect::<Vec<_>>()
        .join("."))
}

pub fn watermark_query(quoted_table: &str) -> String {
    format!("SELECT COALESCE(MAX(id), 0)::BIGINT FROM {quoted_table}")
}

pub fn create_table_statement(quoted_table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {quoted_table} (
            id BIGINT PRIMARY KEY,
            employeeid TEXT,
            direction TEXT,
            shortname TEXT,
            serialno TEXT,
            log_datetime TIMESTAMP
        )"
    )
}

/// Multi-row INSERT for `rows` records.
///
/// Parameters are cast explicitly so the statement also works against
/// tables declared with narrower types (`INTEGER`, `VARCHAR`).
pub fn insert_statement(quoted_table: &str, rows: usize) -> String {
    let mut sql = format!("INSERT INTO {quoted_table} ({COLUMNS}) VALUES ");
    for row in 0..rows {
        if row > 0 {
            sql.push_str(", ");
        }
        let base = row * 6;
        let _ = write!(
            sql,
            "(${}::BIGINT, ${}::TEXT, ${}::TEXT, ${}::TEXT, ${}::TEXT, ${}::TIMESTAMP)",
            base + 1,
            base + 2,
            base + 3,
            base + 4,
            base + 5,
            base + 6
        );
    }
    sql
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_table() {
        assert_eq!(quote_table("public.logs").unwrap(), "public.logs");
        assert_eq!(quote_table("logs").unwrap(), "logs");
        assert_eq!(quote_table("Attendance.Logs").unwrap(), "\"Attendance\".\"Logs\"");
        assert!(quote_table("a.b.c").is_err());
        assert!(quote_table("public.").is_err());
    }

    #[test]
    fn test_insert_statement_numbers_parameters() {
        let sql = insert_statement("public.logs", 2);
        assert_eq!(
            sql,
            "INSERT INTO public.logs (id, employeeid, direction, shortname, serialno, log_datetime) VALUES \
             ($1::BIGINT, $2::TEXT, $3::TEXT, $4::TEXT, $5::TEXT, $6::TIMESTAMP), \
             ($7::BIGINT, $8::TEXT, $9::TEXT, $10::TEXT, $11::TEXT, $12::TIMESTAMP)"
        );
    }

    #[test]
    fn test_insert_chunk_fits_parameter_limit() {
        assert!(INSERT_CHUNK_SIZE * 6 < u16::MAX as usize);
    }

    #[test]
    fn test_create_table_only_requires_id() {
        let sql = create_table_statement("public.logs");
        assert!(sql.contains("id BIGINT PRIMARY KEY"));
        assert!(sql.contains("employeeid TEXT,"));
        assert_eq!(sql.matches("NOT NULL").count(), 0);
    }

    #[test]
    fn test_watermark_query_coalesces() {
        assert_eq!(
            watermark_query("public.logs"),
            "SELECT COALESCE(MAX(id), 0)::BIGINT FROM public.logs"
        );
    }
}
