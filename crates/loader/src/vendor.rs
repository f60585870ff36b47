use crate::error::LoadError;
use crate::table::load_records;
use chrono::NaiveDate;
use core_types::{DataVendor, TableName};
use database::Connector;

/// Inserts one vendor into `data_vendor`, stamped as last updated `today`.
pub async fn insert_data_vendor(
    connector: &dyn Connector,
    vendor: &DataVendor,
    today: NaiveDate,
) -> Result<u64, LoadError> {
    load_records(connector, TableName::DataVendor, &[vendor.to_record(today)]).await
}
