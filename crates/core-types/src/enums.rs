use serde::{Deserialize, Serialize};
use std::fmt;

/// The four tables of the securities master schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TableName {
    DataVendor,
    Exchange,
    Symbol,
    DailyPrice,
}

impl TableName {
    /// Returns the table's name as it appears in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            TableName::DataVendor => "data_vendor",
            TableName::Exchange => "exchange",
            TableName::Symbol => "symbol",
            TableName::DailyPrice => "daily_price",
        }
    }

    /// Whether the table starts with an auto-increment identity column that
    /// must be left out of inserts.
    pub fn has_identity_column(&self) -> bool {
        matches!(self, TableName::DailyPrice)
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
