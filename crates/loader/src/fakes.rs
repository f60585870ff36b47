//! In-memory stand-ins for the database and the market data provider.

use api_client::error::ApiError;
use api_client::MarketDataProvider;
use async_trait::async_trait;
use chrono::NaiveDate;
use core_types::{DailyBar, SqlValue};
use database::{Connector, DbError, InsertStatement, QueryResult, Row, Session};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// A batch that reached `commit`.
#[derive(Debug, Clone)]
pub struct CommittedBatch {
    pub table: String,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl CommittedBatch {
    /// The value of `column` in row `row`.
    pub fn value(&self, row: usize, column: &str) -> &SqlValue {
        let index = self
            .columns
            .iter()
            .position(|c| c == column)
            .unwrap_or_else(|| panic!("no column {column}"));
        &self.rows[row][index]
    }
}

#[derive(Debug, Default)]
pub struct State {
    pub describe: HashMap<String, Vec<Row>>,
    pub symbols: Vec<String>,
    pub committed: Vec<CommittedBatch>,
    pub connects: u32,
    pub reconnects: u32,
    pub commits: u32,
    pub closes: u32,
    pub insert_calls: u32,
    /// The next this-many `insert_batch` calls fail.
    pub fail_next_inserts: u32,
    /// Every `insert_batch` call from this one on (1-based) fails.
    pub fail_from_call: Option<u32>,
}

/// A connector whose sessions share one `State`.
#[derive(Clone, Default)]
pub struct FakeConnector {
    pub state: Arc<Mutex<State>>,
}

impl FakeConnector {
    /// A server with the four securities master tables.
    pub fn with_schema() -> Self {
        let connector = Self::default();
        {
            let mut state = connector.state.lock().unwrap();
            state.describe.insert(
                "data_vendor".into(),
                columns(&[
                    "data_vendor_id",
                    "name",
                    "website_url",
                    "support_email",
                    "created_date",
                    "last_updated_date",
                ]),
            );
            state.describe.insert(
                "exchange".into(),
                columns(&[
                    "exchange_id",
                    "abbrev",
                    "name",
                    "city",
                    "country",
                    "currency",
                    "local_timestamp",
                    "created_date",
                    "last_updated_date",
                ]),
            );
            state.describe.insert(
                "symbol".into(),
                columns(&[
                    "ticker_ex",
                    "ticker",
                    "exchange_id",
                    "security_name",
                    "sector",
                    "sub_industry",
                    "headquarters",
                    "first_added",
                    "cik_id",
                    "founded",
                    "created_date",
                    "last_updated_date",
                ]),
            );
            let mut prices = vec![describe_row("id", "auto_increment")];
            prices.extend(columns(&[
                "data_vendor_id",
                "ticker_ex",
                "price_date",
                "created_date",
                "last_updated_date",
                "open_price",
                "high_price",
                "low_price",
                "close_price",
                "adj_close_price",
                "volume",
            ]));
            state.describe.insert("daily_price".into(), prices);
        }
        connector
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }
}

pub fn describe_row(name: &str, extra: &str) -> Row {
    vec![
        SqlValue::Text(name.into()),
        SqlValue::Text("varchar(255)".into()),
        SqlValue::Text("YES".into()),
        SqlValue::Text(String::new()),
        SqlValue::Null,
        SqlValue::Text(extra.into()),
    ]
}

fn columns(names: &[&str]) -> Vec<Row> {
    names.iter().map(|n| describe_row(n, "")).collect()
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self) -> Result<Box<dyn Session>, DbError> {
        self.state().connects += 1;
        Ok(Box::new(FakeSession {
            state: Arc::clone(&self.state),
            pending: Vec::new(),
        }))
    }
}

pub struct FakeSession {
    state: Arc<Mutex<State>>,
    pending: Vec<CommittedBatch>,
}

#[async_trait]
impl Session for FakeSession {
    async fn query(&mut self, sql: &str, _limit: Option<usize>) -> Result<QueryResult, DbError> {
        let state = self.state.lock().unwrap();
        if let Some(rest) = sql.strip_prefix("DESCRIBE ") {
            let table = rest.trim_matches('`');
            let rows = state.describe.get(table).cloned().unwrap_or_default();
            return Ok(QueryResult {
                columns: vec!["Field".into(), "Type".into()],
                rows,
            });
        }
        if sql.contains("FROM symbol") {
            return Ok(QueryResult {
                columns: vec!["ticker_ex".into()],
                rows: state
                    .symbols
                    .iter()
                    .map(|s| vec![SqlValue::Text(s.clone())])
                    .collect(),
            });
        }
        Ok(QueryResult::default())
    }

    async fn execute(&mut self, _sql: &str) -> Result<u64, DbError> {
        Ok(0)
    }

    async fn insert_batch(
        &mut self,
        statement: &InsertStatement,
        rows: &[Row],
    ) -> Result<u64, DbError> {
        let mut state = self.state.lock().unwrap();
        state.insert_calls += 1;
        let failing_from = state.fail_from_call.is_some_and(|n| state.insert_calls >= n);
        if failing_from || state.fail_next_inserts > 0 {
            state.fail_next_inserts = state.fail_next_inserts.saturating_sub(1);
            self.pending.clear();
            return Err(DbError::ConnectionError(sqlx::Error::PoolTimedOut));
        }
        for row in rows {
            statement.check_row(row)?;
        }
        self.pending.push(CommittedBatch {
            table: statement.table().to_string(),
            columns: statement.columns().to_vec(),
            rows: rows.to_vec(),
        });
        Ok(rows.len() as u64)
    }

    async fn commit(&mut self) -> Result<(), DbError> {
        let mut state = self.state.lock().unwrap();
        state.commits += 1;
        state.committed.append(&mut self.pending);
        Ok(())
    }

    async fn reconnect(&mut self, _attempts: u32) -> Result<(), DbError> {
        self.state.lock().unwrap().reconnects += 1;
        self.pending.clear();
        Ok(())
    }

    async fn close(&mut self) -> Result<(), DbError> {
        self.state.lock().unwrap().closes += 1;
        self.pending.clear();
        Ok(())
    }
}

/// Serves canned bars or canned failures per provider symbol; unknown
/// symbols are not found.
#[derive(Default)]
pub struct FakeProvider {
    pub bars: HashMap<String, Vec<DailyBar>>,
    pub failures: HashMap<String, fn() -> ApiError>,
    pub requests: Mutex<Vec<String>>,
}

impl FakeProvider {
    pub fn with(mut self, symbol: &str, bars: Vec<DailyBar>) -> Self {
        self.bars.insert(symbol.to_string(), bars);
        self
    }

    /// Requests for `symbol` fail with the error `make` builds.
    pub fn failing(mut self, symbol: &str, make: fn() -> ApiError) -> Self {
        self.failures.insert(symbol.to_string(), make);
        self
    }
}

#[async_trait]
impl MarketDataProvider for FakeProvider {
    async fn fetch_daily_history(
        &self,
        symbol: &str,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> Result<Vec<DailyBar>, ApiError> {
        self.requests.lock().unwrap().push(symbol.to_string());
        if let Some(make) = self.failures.get(symbol) {
            return Err(make());
        }
        self.bars
            .get(symbol)
            .cloned()
            .ok_or_else(|| ApiError::SymbolNotFound(symbol.to_string()))
    }
}

pub fn bar(date: NaiveDate, close: f64) -> DailyBar {
    DailyBar {
        date,
        open: Some(close - 1.0),
        high: Some(close + 1.0),
        low: Some(close - 2.0),
        close: Some(close),
        adj_close: Some(close),
        volume: Some(1_000),
    }
}
