use crate::error::LoadError;
use crate::table::prepare_insert;
use api_client::error::ApiError;
use api_client::MarketDataProvider;
use chrono::{NaiveDate, NaiveTime};
use core_types::{DailyBar, Record, TableName};
use database::{connect_with_attempts, Connector, DbError, InsertStatement, Row, Session};
use indicatif::ProgressBar;

/// `price_date` is written as text in this layout.
pub const PRICE_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// How many times a connection is (re)opened before giving up.
pub const DEFAULT_RECONNECT_ATTEMPTS: u32 = 3;
/// The `data_vendor_id` of Yahoo Finance in the vendor table.
pub const YAHOO_VENDOR_ID: i32 = 1;

/// What to backfill and how to stamp it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceLoadRequest {
    /// Tickers with their market code, e.g. "MMM US".
    pub tickers: Vec<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub created_date: NaiveDate,
    pub last_updated_date: NaiveDate,
    pub data_vendor_id: i32,
    pub reconnect_attempts: u32,
}

impl PriceLoadRequest {
    pub fn new(
        tickers: Vec<String>,
        start: NaiveDate,
        end: NaiveDate,
        created_date: NaiveDate,
        today: NaiveDate,
    ) -> Self {
        Self {
            tickers,
            start,
            end,
            created_date,
            last_updated_date: today,
            data_vendor_id: YAHOO_VENDOR_ID,
            reconnect_attempts: DEFAULT_RECONNECT_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceLoadSummary {
    /// Tickers whose prices were inserted and committed.
    pub tickers: usize,
    pub rows: u64,
    /// Tickers the provider reported as not found.
    pub skipped: Vec<String>,
}

/// The provider's symbol for a ticker: the market code is dropped, so
/// "MMM US" is requested as "MMM".
pub fn provider_symbol(ticker_ex: &str) -> &str {
    let trimmed = ticker_ex.trim();
    match trimmed.rsplit_once(char::is_whitespace) {
        Some((ticker, _market)) => ticker.trim_end(),
        None => trimmed,
    }
}

/// Maps one provider bar onto `daily_price` columns.
pub fn bar_record(bar: &DailyBar, ticker_ex: &str, request: &PriceLoadRequest) -> Record {
    let price_date = bar.date.and_time(NaiveTime::MIN).format(PRICE_DATE_FORMAT).to_string();
    Record::new()
        .with("data_vendor_id", request.data_vendor_id)
        .with("ticker_ex", ticker_ex)
        .with("price_date", price_date)
        .with("created_date", request.created_date)
        .with("last_updated_date", request.last_updated_date)
        .with("open_price", bar.open)
        .with("high_price", bar.high)
        .with("low_price", bar.low)
        .with("close_price", bar.close)
        .with("adj_close_price", bar.adj_close)
        .with("volume", bar.volume)
}

/// Backfills `daily_price` for every ticker in the request.
///
/// The table is introspected once. Each ticker then gets its own connection,
/// one batch insert, a commit and a close, so a dropped connection costs at
/// most the ticker in flight. A failed batch is retried exactly once after a
/// reconnect; a second failure is returned. Tickers the provider has no data
/// for are logged and listed in the summary. Any other provider failure stops
/// the backfill; tickers already committed stay committed.
pub async fn insert_price_data(
    connector: &dyn Connector,
    provider: &dyn MarketDataProvider,
    request: &PriceLoadRequest,
    progress: &ProgressBar,
) -> Result<PriceLoadSummary, LoadError> {
    let statement = {
        let mut session = connect_with_attempts(connector, request.reconnect_attempts).await?;
        let statement = prepare_insert(session.as_mut(), TableName::DailyPrice).await?;
        session.close().await?;
        statement
    };

    progress.set_length(request.tickers.len() as u64);
    let mut summary = PriceLoadSummary::default();

    for ticker_ex in &request.tickers {
        let symbol = provider_symbol(ticker_ex);
        progress.set_message(format!("Fetching {ticker_ex}..."));

        let bars = match provider
            .fetch_daily_history(symbol, request.start, request.end)
            .await
        {
            Ok(bars) => bars,
            Err(ApiError::SymbolNotFound(_)) => {
                tracing::warn!(ticker = %ticker_ex, "No price data, skipping ticker.");
                summary.skipped.push(ticker_ex.clone());
                progress.inc(1);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let records: Vec<Record> = bars
            .iter()
            .map(|bar| bar_record(bar, ticker_ex, request))
            .collect();
        let rows = statement.rows_from(&records)?;

        let mut session = connect_with_attempts(connector, request.reconnect_attempts).await?;
        let inserted =
            insert_with_retry(session.as_mut(), &statement, &rows, request.reconnect_attempts)
                .await?;
        session.commit().await?;
        session.close().await?;

        tracing::info!(ticker = %ticker_ex, rows = inserted, "Inserted daily prices.");
        summary.tickers += 1;
        summary.rows += inserted;
        progress.inc(1);
    }

    Ok(summary)
}

/// Inserts `rows`; on failure reconnects (up to `attempts` tries) and
/// retries exactly once.
pub async fn insert_with_retry(
    session: &mut dyn Session,
    statement: &InsertStatement,
    rows: &[Row],
    attempts: u32,
) -> Result<u64, DbError> {
    match session.insert_batch(statement, rows).await {
        Ok(inserted) => Ok(inserted),
        Err(e) => {
            tracing::warn!(
                table = statement.table(),
                error = %e,
                "Batch insert failed, reconnecting and retrying once."
            );
            session.reconnect(attempts).await?;
            session.insert_batch(statement, rows).await
        }
    }
}

/// Every `ticker_ex` currently in the `symbol` table.
pub async fn symbol_tickers(connector: &dyn Connector) -> Result<Vec<String>, LoadError> {
    let mut session = connector.connect().await?;
    let result = session
        .query("SELECT ticker_ex FROM symbol ORDER BY ticker_ex", None)
        .await?;
    session.close().await?;

    Ok(result
        .rows
        .iter()
        .filter_map(|row| row.first().and_then(|v| v.as_text()))
        .collect())
}
