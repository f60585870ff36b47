use crate::error::DbError;
use crate::session::{QueryResult, Row, Session};
use comfy_table::Table;
use core_types::SqlValue;
use serde::Serialize;
use std::fmt;

/// Runs `query`, prints the row count and every row, and returns the rows.
///
/// Errors are logged and swallowed: the caller gets an empty vector.
pub async fn fetch_all(session: &mut dyn Session, query: &str) -> Vec<Row> {
    run_and_print(session, query, None).await
}

/// Like `fetch_all`, but only the first `size` rows are read and printed.
pub async fn fetch_many(session: &mut dyn Session, query: &str, size: usize) -> Vec<Row> {
    run_and_print(session, query, Some(size)).await
}

async fn run_and_print(session: &mut dyn Session, query: &str, limit: Option<usize>) -> Vec<Row> {
    match session.query(query, limit).await {
        Ok(result) => {
            if limit.is_none() {
                println!("Total Row(s): {}", result.rows.len());
            }
            if !result.rows.is_empty() {
                println!("{}", render_table(&result));
            }
            result.rows
        }
        Err(e) => {
            tracing::error!(error = %e, query, "Query failed.");
            Vec::new()
        }
    }
}

/// Renders a result set as a text table.
pub fn render_table(result: &QueryResult) -> Table {
    let mut table = Table::new();
    if !result.columns.is_empty() {
        table.set_header(result.columns.clone());
    }
    for row in &result.rows {
        table.add_row(row.iter().map(ToString::to_string).collect::<Vec<_>>());
    }
    table
}

/// Lists the databases visible to the session's user.
pub async fn show_databases(session: &mut dyn Session) -> Vec<String> {
    fetch_all(session, "SHOW DATABASES")
        .await
        .into_iter()
        .filter_map(|row| row.first().and_then(SqlValue::as_text))
        .collect()
}

/// Status and login details of the current session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConnectionDetails {
    pub connection_id: Option<u64>,
    pub database: Option<String>,
    pub user: Option<String>,
    pub server_host: Option<String>,
    pub server_port: Option<u64>,
    pub charset: Option<String>,
    pub server_version: Option<String>,
}

const DETAILS_QUERY: &str = "SELECT CONNECTION_ID(), DATABASE(), CURRENT_USER(), @@hostname, \
                             @@port, @@character_set_connection, VERSION()";

pub async fn connection_details(session: &mut dyn Session) -> Result<ConnectionDetails, DbError> {
    let result = session.query(DETAILS_QUERY, Some(1)).await?;
    let Some(row) = result.rows.first() else {
        return Ok(ConnectionDetails::default());
    };

    let text = |i: usize| row.get(i).and_then(SqlValue::as_text);
    let number = |i: usize| text(i).and_then(|s| s.parse::<u64>().ok());

    Ok(ConnectionDetails {
        connection_id: number(0),
        database: text(1),
        user: text(2),
        server_host: text(3),
        server_port: number(4),
        charset: text(5),
        server_version: text(6),
    })
}

impl fmt::Display for ConnectionDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn show<T: fmt::Display>(v: &Option<T>) -> String {
            v.as_ref().map_or_else(|| "-".to_string(), ToString::to_string)
        }
        writeln!(f, "Connection ID: {}", show(&self.connection_id))?;
        writeln!(f, "Database: {}", show(&self.database))?;
        writeln!(f, "User: {}", show(&self.user))?;
        writeln!(f, "Server Host: {}", show(&self.server_host))?;
        writeln!(f, "Server Port: {}", show(&self.server_port))?;
        writeln!(f, "Connection Character Set: {}", show(&self.charset))?;
        write!(f, "Server Version: {}", show(&self.server_version))
    }
}
