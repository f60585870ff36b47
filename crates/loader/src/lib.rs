//! # Securities Master Loader Crate
//!
//! Populates the four securities master tables. Every loader goes through
//! the same cycle: open a session, introspect the target table, order each
//! record by the introspected columns, batch insert, commit, close.
//!
//! ## Public API
//!
//! - `insert_data_vendor`: one row into `data_vendor`.
//! - `insert_exchange`: one row into `exchange`, timestamped in the exchange's timezone.
//! - `insert_symbols`: every line of a symbol list CSV into `symbol`.
//! - `insert_price_data`: a per-ticker daily price backfill into `daily_price`
//!   from any `MarketDataProvider`, with reconnect-and-retry-once on a failed batch.
//! - `LoadError`: the errors a load can fail with.

pub mod error;
pub mod exchange;
pub mod price;
pub mod symbol;
pub mod table;
pub mod vendor;

#[cfg(test)]
mod fakes;

pub use error::LoadError;
pub use exchange::insert_exchange;
pub use price::{
    bar_record, insert_price_data, insert_with_retry, provider_symbol, symbol_tickers,
    PriceLoadRequest, PriceLoadSummary, DEFAULT_RECONNECT_ATTEMPTS, PRICE_DATE_FORMAT,
    YAHOO_VENDOR_ID,
};
pub use symbol::{insert_symbols, insert_symbols_from_reader, read_symbol_records};
pub use table::{load_records, prepare_insert};
pub use vendor::insert_data_vendor;
