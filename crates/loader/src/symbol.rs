use crate::error::LoadError;
use crate::table::load_records;
use chrono::NaiveDate;
use core_types::{Record, SqlValue, TableName};
use database::Connector;
use std::io;
use std::path::Path;

/// The issuer identifier column, stored as text.
pub const CIK_COLUMN: &str = "cik_id";

/// Reads a symbol list and inserts every row into `symbol`.
pub async fn insert_symbols(
    connector: &dyn Connector,
    csv_path: &Path,
    created_date: NaiveDate,
    today: NaiveDate,
) -> Result<u64, LoadError> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(csv_path)?;
    let records = collect_records(reader, created_date, today)?;
    tracing::info!(path = %csv_path.display(), symbols = records.len(), "Read symbol list.");
    load_records(connector, TableName::Symbol, &records).await
}

/// Like `insert_symbols`, reading from any CSV source.
pub async fn insert_symbols_from_reader<R: io::Read>(
    connector: &dyn Connector,
    reader: R,
    created_date: NaiveDate,
    today: NaiveDate,
) -> Result<u64, LoadError> {
    let records = read_symbol_records(reader, created_date, today)?;
    load_records(connector, TableName::Symbol, &records).await
}

/// Parses a headed CSV into one record per line.
///
/// Empty cells become NULL, `cik_id` is normalized to integer text, and
/// `created_date`/`last_updated_date` are stamped on every row.
pub fn read_symbol_records<R: io::Read>(
    reader: R,
    created_date: NaiveDate,
    today: NaiveDate,
) -> Result<Vec<Record>, LoadError> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    collect_records(reader, created_date, today)
}

fn collect_records<R: io::Read>(
    mut reader: csv::Reader<R>,
    created_date: NaiveDate,
    today: NaiveDate,
) -> Result<Vec<Record>, LoadError> {
    let headers = reader.headers()?.clone();

    let mut records = Vec::new();
    for line in reader.records() {
        let line = line?;
        let mut record = Record::new();
        for (header, cell) in headers.iter().zip(line.iter()) {
            let value = if header == CIK_COLUMN {
                normalize_identifier(cell)
            } else if cell.is_empty() {
                SqlValue::Null
            } else {
                SqlValue::from(cell)
            };
            record.set(header, value);
        }
        record.set("created_date", created_date);
        record.set("last_updated_date", today);
        records.push(record);
    }
    Ok(records)
}

/// Renders a numeric identifier as integer text: spreadsheets and dataframe
/// exports often write `66740` as `66740.0`.
fn normalize_identifier(raw: &str) -> SqlValue {
    if raw.is_empty() {
        return SqlValue::Null;
    }
    match raw.parse::<f64>() {
        Ok(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => {
            SqlValue::Text(format!("{}", n as i64))
        }
        _ => SqlValue::Text(raw.to_string()),
    }
}
