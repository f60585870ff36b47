use crate::error::CoreError;
use crate::value::SqlValue;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The timezone used when an exchange does not name its own.
pub const DEFAULT_EXCHANGE_TIMEZONE: &str = "America/New_York";

/// One row destined for a table, keyed by column name.
///
/// Values are looked up by the column names introspected from the database,
/// so the order in which fields are set does not matter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    fields: BTreeMap<String, SqlValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.set(column, value);
        self
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<SqlValue>) {
        self.fields.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.fields.get(column)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

/// An organization that supplies market data, e.g. Yahoo Finance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataVendor {
    pub data_vendor_id: i32,
    pub name: String,
    pub website_url: String,
    pub support_email: String,
    /// First time the vendor was entered into the database.
    pub created_date: NaiveDate,
}

impl DataVendor {
    pub fn to_record(&self, last_updated_date: NaiveDate) -> Record {
        Record::new()
            .with("data_vendor_id", self.data_vendor_id)
            .with("name", &self.name)
            .with("website_url", &self.website_url)
            .with("support_email", &self.support_email)
            .with("created_date", self.created_date)
            .with("last_updated_date", last_updated_date)
    }
}

/// A trading venue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    /// Market code, e.g. "US".
    pub exchange_id: String,
    /// e.g. "NYSE".
    pub abbrev: String,
    pub name: String,
    pub city: String,
    pub country: String,
    pub currency: String,
    /// IANA timezone name, e.g. "America/New_York".
    pub timezone: String,
    pub created_date: NaiveDate,
}

impl Exchange {
    /// Parses the exchange's IANA timezone.
    pub fn tz(&self) -> Result<Tz, CoreError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| CoreError::UnknownTimezone(self.timezone.clone()))
    }

    /// Converts `now` into the exchange's local time.
    pub fn localize(&self, now: DateTime<Utc>) -> Result<DateTime<Tz>, CoreError> {
        Ok(now.with_timezone(&self.tz()?))
    }

    pub fn to_record(
        &self,
        now: DateTime<Utc>,
        last_updated_date: NaiveDate,
    ) -> Result<Record, CoreError> {
        Ok(Record::new()
            .with("exchange_id", &self.exchange_id)
            .with("abbrev", &self.abbrev)
            .with("name", &self.name)
            .with("city", &self.city)
            .with("country", &self.country)
            .with("currency", &self.currency)
            .with("local_timestamp", self.localize(now)?)
            .with("created_date", self.created_date)
            .with("last_updated_date", last_updated_date))
    }
}

/// One daily OHLCV observation as returned by a market data provider.
/// Missing fields are `None`, which are stored as NULL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub adj_close: Option<f64>,
    pub volume: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDateTime, TimeZone};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn nyse() -> Exchange {
        Exchange {
            exchange_id: "US".into(),
            abbrev: "NYSE".into(),
            name: "New York Stock Exchange".into(),
            city: "New York".into(),
            country: "US".into(),
            currency: "USD".into(),
            timezone: DEFAULT_EXCHANGE_TIMEZONE.into(),
            created_date: date(2019, 2, 14),
        }
    }

    #[test]
    fn vendor_record_has_every_column() {
        let vendor = DataVendor {
            data_vendor_id: 1,
            name: "Yahoo Finance".into(),
            website_url: "https://finance.yahoo.com".into(),
            support_email: "support@yahoo.com".into(),
            created_date: date(2019, 2, 14),
        };
        let record = vendor.to_record(date(2024, 5, 1));
        assert_eq!(record.len(), 6);
        assert_eq!(record.get("data_vendor_id"), Some(&SqlValue::Int(1)));
        assert_eq!(
            record.get("last_updated_date"),
            Some(&SqlValue::Date(date(2024, 5, 1)))
        );
    }

    #[test]
    fn exchange_timestamp_is_localized() {
        let now = Utc.with_ymd_and_hms(2024, 7, 1, 16, 30, 0).unwrap();
        let record = nyse().to_record(now, date(2024, 7, 1)).unwrap();
        let expected =
            NaiveDateTime::parse_from_str("2024-07-01 12:30:00", "%Y-%m-%d %H:%M:%S").unwrap();
        assert_eq!(record.get("local_timestamp"), Some(&SqlValue::DateTime(expected)));
    }

    #[test]
    fn unknown_timezone_is_rejected() {
        let mut exchange = nyse();
        exchange.timezone = "Mars/Olympus_Mons".into();
        assert!(matches!(
            exchange.tz(),
            Err(CoreError::UnknownTimezone(tz)) if tz == "Mars/Olympus_Mons"
        ));
    }
}
