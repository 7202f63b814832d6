//! SQL Server connection utilities
//!
//! Connections are opened per operation and dropped when the caller is done
//! with them; there is no long-lived handle.

use anyhow::{Context, Result};
use sync_core::StoreError;
use tiberius::{Client, Config};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::debug;

pub type MssqlClient = Client<Compat<TcpStream>>;

/// Parse an ADO.NET style connection string
/// (`server=tcp:host,1433;user id=...;password=...;database=...`).
pub fn parse_connection_string(connection_string: &str) -> Result<Config> {
    Config::from_ado_string(connection_string).with_context(|| {
        format!(
            "Invalid SQL Server connection string '{}'",
            sanitize_connection_string(connection_string)
        )
    })
}

/// Open a new connection, following a server redirect once if needed.
pub async fn connect(config: &Config) -> Result<MssqlClient, StoreError> {
    let tcp = open_tcp(config.get_addr()).await?;

    match Client::connect(config.clone(), tcp.compat_write()).await {
        Ok(client) => Ok(client),
        // Azure SQL gateways answer the first login with a redirect
        Err(tiberius::error::Error::Routing { host, port }) => {
            debug!("SQL Server redirected connection to {host}:{port}");
            let mut redirected = config.clone();
            redirected.host(&host);
            redirected.port(port);
            let tcp = open_tcp(redirected.get_addr()).await?;
            Client::connect(redirected, tcp.compat_write())
                .await
                .map_err(StoreError::connection)
        }
        Err(e) => Err(StoreError::connection(e)),
    }
}

async fn open_tcp(addr: String) -> Result<TcpStream, StoreError> {
    let tcp = TcpStream::connect(&addr).await.map_err(|e| {
        StoreError::connection(format!("Failed to connect to SQL Server at {addr}: {e}"))
    })?;
    tcp.set_nodelay(true).map_err(StoreError::connection)?;
    Ok(tcp)
}

/// Hide the password in an ADO.NET connection string for logging.
///
/// Values may be wrapped in `{}`, `'` or `"` and then contain `;`.
pub fn sanitize_connection_string(connection_string: &str) -> String {
    let mut masked = String::with_capacity(connection_string.len());
    let mut rest = connection_string;
    while !rest.is_empty() {
        let Some(eq) = rest.find('=') else {
            masked.push_str(rest);
            break;
        };
        let key = &rest[..eq];
        if key.contains(';') {
            // Stray segment without a value
            let semi = key.find(';').map_or(0, |p| p + 1);
            masked.push_str(&rest[..semi]);
            rest = &rest[semi..];
            continue;
        }
        let value_end = eq + 1 + value_len(&rest[eq + 1..]);
        if is_password_key(key) {
            masked.push_str(&rest[..=eq]);
            masked.push_str("***");
        } else {
            masked.push_str(&rest[..value_end]);
        }
        rest = &rest[value_end..];
        if let Some(tail) = rest.strip_prefix(';') {
            masked.push(';');
            rest = tail;
        }
    }
    masked
}

/// Length of an ADO value up to (not including) its terminating `;`.
fn value_len(value: &str) -> usize {
    let trimmed = value.trim_start();
    let lead = value.len() - trimmed.len();
    let close = match trimmed.chars().next() {
        Some('{') => '}',
        Some(q @ ('\'' | '"')) => q,
        _ => return value.find(';').unwrap_or(value.len()),
    };
    let mut chars = trimmed.char_indices().skip(1).peekable();
    while let Some((i, c)) = chars.next() {
        if c == close {
            // A doubled delimiter is an escaped literal
            if chars.peek().map(|&(_, n)| n) == Some(close) {
                chars.next();
                continue;
            }
            let end = lead + i + 1;
            return end + value[end..].find(';').unwrap_or(value.len() - end);
        }
    }
    value.len()
}

fn is_password_key(key: &str) -> bool {
    matches!(key.trim().to_ascii_lowercase().as_str(), "password" | "pwd")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_hides_password() {
        let s = "server=tcp:127.0.0.1,1433;user id=sync;password=secret;database=biotime";
        assert_eq!(
            sanitize_connection_string(s),
            "server=tcp:127.0.0.1,1433;user id=sync;password=***;database=biotime"
        );
    }

    #[test]
    fn test_sanitize_handles_pwd_alias() {
        let s = "Server=db;UID=sync;PWD=secret";
        assert_eq!(sanitize_connection_string(s), "Server=db;UID=sync;PWD=***");
    }

    #[test]
    fn test_sanitize_quoted_password() {
        assert_eq!(
            sanitize_connection_string("server=db;password={se;cr}}et};database=biotime"),
            "server=db;password=***;database=biotime"
        );
        assert_eq!(
            sanitize_connection_string("server=db;Password='a;b''c';user id=sync"),
            "server=db;Password=***;user id=sync"
        );
        assert_eq!(
            sanitize_connection_string("server=db;pwd=\"x;y\""),
            "server=db;pwd=***"
        );
    }

    #[test]
    fn test_sanitize_keeps_trailing_semicolon() {
        assert_eq!(
            sanitize_connection_string("server=db;password=secret;"),
            "server=db;password=***;"
        );
    }

    #[test]
    fn test_parse_connection_string() {
        let config =
            parse_connection_string("server=tcp:db.internal,1444;user id=sa;password=x").unwrap();
        assert_eq!(config.get_addr(), "db.internal:1444");
    }
}
