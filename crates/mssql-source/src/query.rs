//! SQL text for the source range query.

use anyhow::{bail, Result};

/// Default source table
pub const DEFAULT_TABLE: &str = "dbo.logs";

/// Quote a possibly schema-qualified table name (`dbo.logs`, `[dbo].[logs]`)
/// as `[dbo].[logs]`.
pub fn quote_table(table: &str) -> Result<String> {
    let parts: Vec<&str> = table.split('.').map(str::trim).collect();
    if parts.is_empty() || parts.len() > 3 {
        bail!("Invalid SQL Server table name '{table}'");
    }

    let mut quoted = Vec::with_capacity(parts.len());
    for part in parts {
        let bare = part
            .strip_prefix('[')
            .and_then(|p| p.strip_suffix(']'))
            .unwrap_or(part);
        if bare.is_empty() {
            bail!("Invalid SQL Server table name '{table}'");
        }
        quoted.push(format!("[{}]", bare.replace(']', "]]")));
    }
    Ok(quoted.join("."))
}

/// Range query for rows above the watermark (`@P1`).
///
/// With `limited` set the query takes `@P2` rows, lowest ids first.
/// Columns are cast so every SQL Server integer or string flavour decodes
/// into the same Rust types.
pub fn fetch_query(quoted_table: &str, limited: bool) -> String {
    let columns = "CAST([id] AS BIGINT) AS id, \
         CAST([employeeid] AS NVARCHAR(MAX)) AS employeeid, \
         CAST([direction] AS NVARCHAR(MAX)) AS direction, \
         CAST([shortname] AS NVARCHAR(MAX)) AS shortname, \
         CAST([serialno] AS NVARCHAR(MAX)) AS serialno, \
         CAST([log_datetime] AS DATETIME2) AS log_datetime";

    if limited {
        format!(
            "SELECT TOP (@P2) {columns} FROM {quoted_table} WHERE [id] > @P1 ORDER BY [id]"
        )
    } else {
        format!("SELECT {columns} FROM {quoted_table} WHERE [id] > @P1")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_table_variants() {
        assert_eq!(quote_table("dbo.logs").unwrap(), "[dbo].[logs]");
        assert_eq!(quote_table("[dbo].[logs]").unwrap(), "[dbo].[logs]");
        assert_eq!(
            quote_table("biotime.dbo.logs").unwrap(),
            "[biotime].[dbo].[logs]"
        );
        assert_eq!(quote_table("logs").unwrap(), "[logs]");
    }

    #[test]
    fn test_quote_table_escapes_brackets() {
        assert_eq!(quote_table("odd]name").unwrap(), "[odd]]name]");
    }

    #[test]
    fn test_quote_table_rejects_empty_parts() {
        assert!(quote_table("").is_err());
        assert!(quote_table("dbo.").is_err());
        assert!(quote_table("a.b.c.d").is_err());
    }

    #[test]
    fn test_unbounded_query_has_no_order_or_top() {
        let q = fetch_query("[dbo].[logs]", false);
        assert!(q.contains("FROM [dbo].[logs] WHERE [id] > @P1"));
        assert!(!q.contains("TOP"));
        assert!(!q.contains("ORDER BY"));
    }

    #[test]
    fn test_text_columns_are_not_truncated() {
        let q = fetch_query("[dbo].[logs]", false);
        for column in ["employeeid", "direction", "shortname", "serialno"] {
            assert!(
                q.contains(&format!("CAST([{column}] AS NVARCHAR(MAX)) AS {column}")),
                "{column} in {q}"
            );
        }
        assert!(!q.contains("NVARCHAR(64)"));
        assert!(!q.contains("NVARCHAR(255)"));
    }

    #[test]
    fn test_limited_query_orders_by_id() {
        let q = fetch_query("[dbo].[logs]", true);
        assert!(q.starts_with("SELECT TOP (@P2) "));
        assert!(q.ends_with("WHERE [id] > @P1 ORDER BY [id]"));
    }
}
