//! # Securities Master Database Crate
//!
//! This crate is the data-access layer over the MySQL securities master
//! (`data_vendor`, `exchange`, `symbol`, `daily_price`).
//!
//! ## Architectural Principles
//!
//! - **Adapter:** All MySQL-specific logic lives here. Callers work with the
//!   `Session` and `Connector` traits, so the loaders can be exercised
//!   against in-memory fakes.
//! - **Introspection over hard-coding:** Inserts are built from the column
//!   list the server reports for a table (`DESCRIBE`), never from a column
//!   list compiled into the binary.
//! - **Normalized parameters:** Every bound value is a `core_types::SqlValue`.
//!
//! ## Public API
//!
//! - `MySqlConnector`: the connection factory, built from the INI credentials file.
//! - `Session`: one live connection; `MySqlSession` is the MySQL implementation.
//! - `describe_table` / `InsertStatement`: column introspection and INSERT building.
//! - `fetch_all`, `fetch_many`, `show_databases`, `connection_details`: read helpers.
//! - `create_database`, `run_migrations`: schema bootstrap.
//! - `DbError`: the specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod error;
pub mod query;
pub mod session;
pub mod statement;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{
    connect_with_attempts, create_database, run_migrations, ConnectionTarget, Connector,
    MySqlConnector,
};
pub use error::DbError;
pub use query::{connection_details, fetch_all, fetch_many, show_databases, ConnectionDetails};
pub use session::{MySqlSession, QueryResult, Row, Session};
pub use statement::{describe_table, quote_identifier, ColumnInfo, InsertStatement};
