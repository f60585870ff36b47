use crate::error::ApiError;
use chrono::DateTime;
use core_types::DailyBar;
use serde::Deserialize;

// Yahoo's v8 chart payload. Only the fields used for daily bars are modelled.

/// The response from `GET /v8/finance/chart/{symbol}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChartResponse {
    pub chart: ChartBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartBody {
    pub result: Option<Vec<ChartResult>>,
    pub error: Option<ChartError>,
}

/// Represents an error response from the chart API.
#[derive(Debug, Clone, Deserialize)]
pub struct ChartError {
    pub code: String,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartResult {
    pub meta: Option<ChartMeta>,
    pub timestamp: Option<Vec<i64>>,
    pub indicators: Indicators,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMeta {
    pub symbol: Option<String>,
    pub currency: Option<String>,
    /// Seconds east of UTC for the listing exchange.
    pub gmtoffset: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Indicators {
    pub quote: Vec<QuoteSeries>,
    pub adjclose: Option<Vec<AdjCloseSeries>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuoteSeries {
    #[serde(default)]
    pub open: Vec<Option<f64>>,
    #[serde(default)]
    pub high: Vec<Option<f64>>,
    #[serde(default)]
    pub low: Vec<Option<f64>>,
    #[serde(default)]
    pub close: Vec<Option<f64>>,
    #[serde(default)]
    pub volume: Vec<Option<u64>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdjCloseSeries {
    #[serde(default)]
    pub adjclose: Vec<Option<f64>>,
}

impl ChartResponse {
    /// Converts the column-oriented payload into one `DailyBar` per trading day.
    ///
    /// Timestamps are shifted by the exchange's UTC offset before taking the
    /// date. Days where every OHLCV field is null (holidays) are skipped.
    pub fn into_bars(self, symbol: &str) -> Result<Vec<DailyBar>, ApiError> {
        if let Some(err) = self.chart.error {
            return Err(if err.code.eq_ignore_ascii_case("Not Found") {
                ApiError::SymbolNotFound(symbol.to_string())
            } else {
                ApiError::ApiError(format!("{}: {}", err.code, err.description))
            });
        }

        let result = self
            .chart
            .result
            .and_then(|r| r.into_iter().next())
            .ok_or_else(|| ApiError::SymbolNotFound(symbol.to_string()))?;

        let offset = result.meta.as_ref().and_then(|m| m.gmtoffset).unwrap_or(0);
        let timestamps = result.timestamp.unwrap_or_default();
        let quote = result
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::InvalidData(format!("no quote series for {symbol}")))?;
        let adj_close = result
            .indicators
            .adjclose
            .and_then(|a| a.into_iter().next())
            .map(|a| a.adjclose)
            .unwrap_or_default();

        fn at(series: &[Option<f64>], i: usize) -> Option<f64> {
            series.get(i).copied().flatten()
        }

        let mut bars = Vec::with_capacity(timestamps.len());
        for (i, &ts) in timestamps.iter().enumerate() {
            let date = DateTime::from_timestamp(ts + offset, 0)
                .map(|dt| dt.date_naive())
                .ok_or_else(|| ApiError::InvalidData(format!("invalid timestamp: {ts}")))?;

            let bar = DailyBar {
                date,
                open: at(&quote.open, i),
                high: at(&quote.high, i),
                low: at(&quote.low, i),
                close: at(&quote.close, i),
                adj_close: at(&adj_close, i),
                volume: quote.volume.get(i).copied().flatten(),
            };

            let empty = bar.open.is_none()
                && bar.high.is_none()
                && bar.low.is_none()
                && bar.close.is_none()
                && bar.volume.is_none();
            if !empty {
                bars.push(bar);
            }
        }

        if bars.is_empty() {
            return Err(ApiError::SymbolNotFound(symbol.to_string()));
        }
        Ok(bars)
    }
}
