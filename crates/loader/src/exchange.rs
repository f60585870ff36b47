use crate::error::LoadError;
use crate::table::load_records;
use chrono::{DateTime, NaiveDate, Utc};
use core_types::{Exchange, TableName};
use database::Connector;

/// Inserts one exchange into `exchange`.
///
/// `now` is stored as wall-clock time in the exchange's own timezone. An
/// unknown timezone is rejected before any connection is opened.
pub async fn insert_exchange(
    connector: &dyn Connector,
    exchange: &Exchange,
    now: DateTime<Utc>,
    today: NaiveDate,
) -> Result<u64, LoadError> {
    let record = exchange.to_record(now, today)?;
    load_records(connector, TableName::Exchange, &[record]).await
}
