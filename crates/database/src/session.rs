use crate::connection::ConnectionTarget;
use crate::error::DbError;
use crate::statement::InsertStatement;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use core_types::SqlValue;
use futures::TryStreamExt;
use rust_decimal::Decimal;
use sqlx::mysql::{MySqlArguments, MySqlPool, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, Executor, MySql, Row as _, Transaction, TypeInfo};

/// One result or parameter row.
pub type Row = Vec<SqlValue>;

/// The rows returned by a read query, with their column names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

/// A live database session.
///
/// Writes are transactional: they stay pending until `commit`, and anything
/// uncommitted is rolled back by `reconnect`, `close`, or drop.
#[async_trait]
pub trait Session: Send {
    /// Runs a read query, returning at most `limit` rows (all when `None`).
    async fn query(&mut self, sql: &str, limit: Option<usize>) -> Result<QueryResult, DbError>;

    /// Runs a statement that returns no rows. Returns the affected row count.
    async fn execute(&mut self, sql: &str) -> Result<u64, DbError>;

    /// Inserts `rows` with `statement`, batching as many rows per round trip
    /// as the placeholder limit allows.
    async fn insert_batch(
        &mut self,
        statement: &InsertStatement,
        rows: &[Row],
    ) -> Result<u64, DbError>;

    async fn commit(&mut self) -> Result<(), DbError>;

    /// Drops the current connection and opens a new one, trying up to
    /// `attempts` times with no delay in between.
    async fn reconnect(&mut self, attempts: u32) -> Result<(), DbError>;

    async fn close(&mut self) -> Result<(), DbError>;
}

/// A `Session` backed by a single-connection MySQL pool.
pub struct MySqlSession {
    target: ConnectionTarget,
    pool: MySqlPool,
    tx: Option<Transaction<'static, MySql>>,
}

impl MySqlSession {
    pub(crate) fn new(target: ConnectionTarget, pool: MySqlPool) -> Self {
        Self {
            target,
            pool,
            tx: None,
        }
    }

    pub fn target(&self) -> &ConnectionTarget {
        &self.target
    }
}

#[async_trait]
impl Session for MySqlSession {
    async fn query(&mut self, sql: &str, limit: Option<usize>) -> Result<QueryResult, DbError> {
        // The pool holds one connection, so reads inside an open transaction must use it.
        match self.tx.as_mut() {
            Some(tx) => fetch_rows(&mut **tx, sql, limit).await,
            None => fetch_rows(&self.pool, sql, limit).await,
        }
    }

    async fn execute(&mut self, sql: &str) -> Result<u64, DbError> {
        let result = match self.tx.as_mut() {
            Some(tx) => {
                let conn: &mut sqlx::MySqlConnection = &mut **tx;
                conn.execute(sql).await?
            }
            None => (&self.pool).execute(sql).await?,
        };
        Ok(result.rows_affected())
    }

    async fn insert_batch(
        &mut self,
        statement: &InsertStatement,
        rows: &[Row],
    ) -> Result<u64, DbError> {
        if rows.is_empty() {
            return Ok(0);
        }
        for row in rows {
            statement.check_row(row)?;
        }

        // On error the transaction is dropped here, which rolls back this batch
        // together with any earlier uncommitted writes.
        let mut tx = match self.tx.take() {
            Some(tx) => tx,
            None => self.pool.begin().await?,
        };

        let mut affected = 0;
        for chunk in rows.chunks(statement.rows_per_statement()) {
            let sql = statement.sql_for_rows(chunk.len());
            let mut query = sqlx::query(&sql);
            for value in chunk.iter().flatten() {
                query = bind_value(query, value);
            }
            affected += query.execute(&mut *tx).await?.rows_affected();
        }

        self.tx = Some(tx);
        tracing::debug!(table = statement.table(), rows = affected, "Inserted batch.");
        Ok(affected)
    }

    async fn commit(&mut self) -> Result<(), DbError> {
        if let Some(tx) = self.tx.take() {
            tx.commit().await?;
        }
        Ok(())
    }

    async fn reconnect(&mut self, attempts: u32) -> Result<(), DbError> {
        self.tx = None;
        self.pool.close().await;
        self.pool = self.target.open_pool_with_attempts(attempts).await?;
        tracing::info!(host = %self.target.host, "Reconnected to the database.");
        Ok(())
    }

    async fn close(&mut self) -> Result<(), DbError> {
        self.tx = None;
        self.pool.close().await;
        Ok(())
    }
}

/// Binds one normalized value. Every parameter goes through here, so the
/// driver only ever sees the generic representations of `SqlValue`.
fn bind_value<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: &SqlValue,
) -> Query<'q, MySql, MySqlArguments> {
    match value {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Int(v) => query.bind(*v),
        SqlValue::UInt(v) => query.bind(*v),
        SqlValue::Float(v) => query.bind(*v),
        SqlValue::Decimal(v) => query.bind(*v),
        SqlValue::Text(v) => query.bind(v.clone()),
        SqlValue::Date(v) => query.bind(*v),
        SqlValue::DateTime(v) => query.bind(*v),
    }
}

/// Streams a text-protocol query, stopping after `limit` rows.
async fn fetch_rows<'c, E>(
    executor: E,
    sql: &'c str,
    limit: Option<usize>,
) -> Result<QueryResult, DbError>
where
    E: Executor<'c, Database = MySql>,
{
    let mut stream = sqlx::raw_sql(sql).fetch(executor);
    let mut result = QueryResult::default();

    while limit.is_none_or(|n| result.rows.len() < n) {
        let Some(row) = stream.try_next().await? else {
            break;
        };
        if result.columns.is_empty() {
            result.columns = row.columns().iter().map(|c| c.name().to_string()).collect();
        }
        result.rows.push(decode_row(&row));
    }

    Ok(result)
}

fn decode_row(row: &MySqlRow) -> Row {
    (0..row.len()).map(|i| decode_cell(row, i)).collect()
}

/// Decodes a cell by its reported column type, falling back to text and then
/// to raw bytes for anything else (VARBINARY metadata columns included).
fn decode_cell(row: &MySqlRow, index: usize) -> SqlValue {
    let type_name = row.column(index).type_info().name().to_ascii_uppercase();

    let typed = match type_name.as_str() {
        t if t.ends_with("UNSIGNED") => row.try_get::<Option<u64>, _>(index).ok().map(SqlValue::from),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "BOOLEAN" => {
            row.try_get::<Option<i64>, _>(index).ok().map(SqlValue::from)
        }
        "FLOAT" | "DOUBLE" => row.try_get::<Option<f64>, _>(index).ok().map(SqlValue::from),
        "DECIMAL" => row.try_get::<Option<Decimal>, _>(index).ok().map(SqlValue::from),
        "DATE" => row.try_get::<Option<NaiveDate>, _>(index).ok().map(SqlValue::from),
        "DATETIME" | "TIMESTAMP" => row
            .try_get::<Option<NaiveDateTime>, _>(index)
            .ok()
            .map(SqlValue::from),
        _ => None,
    };

    typed
        .or_else(|| row.try_get::<Option<String>, _>(index).ok().map(SqlValue::from))
        .or_else(|| {
            row.try_get_unchecked::<Option<Vec<u8>>, _>(index)
                .ok()
                .map(|bytes| SqlValue::from(bytes.map(|b| String::from_utf8_lossy(&b).into_owned())))
        })
        .unwrap_or(SqlValue::Null)
}
