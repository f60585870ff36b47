use crate::error::ApiError;
use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use core_types::DailyBar;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Url;
use std::time::Duration;

pub mod error;
pub mod responses;
// --- Public API ---
pub use responses::{ChartError, ChartResponse};

/// The public Yahoo Finance chart endpoint host.
pub const YAHOO_BASE_URL: &str = "https://query2.finance.yahoo.com";

/// A source of historical daily bars. The price loader only sees this trait.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetches daily bars for `symbol` from `start` to `end`, both inclusive.
    async fn fetch_daily_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyBar>, ApiError>;
}

/// A concrete implementation of the `MarketDataProvider` for Yahoo Finance.
#[derive(Clone)]
pub struct YahooClient {
    client: reqwest::Client,
    base_url: String,
}

impl YahooClient {
    pub fn new() -> Result<Self, ApiError> {
        Self::with_base_url(YAHOO_BASE_URL)
    }

    /// Points the client at another host serving the same chart API.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, ApiError> {
        // Yahoo rejects requests without a browser-like user agent.
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Builds the chart URL. The symbol goes in as an escaped path segment.
    fn chart_url(&self, symbol: &str) -> Result<Url, ApiError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ApiError::InvalidData(format!("bad base URL {}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidData(format!("bad base URL {}", self.base_url)))?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", symbol]);
        Ok(url)
    }
}

/// Unix seconds for midnight UTC of `date`.
fn epoch_seconds(date: NaiveDate) -> i64 {
    date.and_time(chrono::NaiveTime::MIN).and_utc().timestamp()
}

#[async_trait]
impl MarketDataProvider for YahooClient {
    async fn fetch_daily_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyBar>, ApiError> {
        if end < start {
            return Err(ApiError::InvalidData(format!(
                "end date {end} is before start date {start}"
            )));
        }
        // period2 is exclusive, so ask for midnight after the end date.
        let period2 = end.checked_add_days(Days::new(1)).unwrap_or(end);

        let url = self.chart_url(symbol)?;
        tracing::debug!(symbol, %start, %end, "Requesting daily history.");

        let response = self
            .client
            .get(url)
            .query(&[
                ("period1", epoch_seconds(start).to_string()),
                ("period2", epoch_seconds(period2).to_string()),
                ("interval", "1d".to_string()),
                ("includeAdjustedClose", "true".to_string()),
            ])
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;

        // Error bodies use the same envelope, so try to parse them either way.
        match serde_json::from_str::<ChartResponse>(&text) {
            Ok(chart) => chart.into_bars(symbol),
            Err(_) if !status.is_success() => {
                Err(ApiError::ApiError(format!("HTTP {status} for {symbol}: {text}")))
            }
            Err(e) => Err(ApiError::Deserialization(e.to_string())),
        }
    }
}
