pub mod enums;
pub mod error;
pub mod structs;
pub mod value;

// Re-export the core types to provide a clean public API.
pub use enums::TableName;
pub use error::CoreError;
pub use structs::{DailyBar, DataVendor, Exchange, Record, DEFAULT_EXCHANGE_TIMEZONE};
pub use value::{normalize, SqlValue};
