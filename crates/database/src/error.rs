use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Failed to load the configuration for the database connection: {0}")]
    ConnectionConfigError(#[from] configuration::error::ConfigError),

    #[error("Failed to connect to the database: {0}")]
    ConnectionError(#[from] sqlx::Error),

    #[error("Database migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Invalid SQL identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("Table '{0}' reported no columns.")]
    NoColumns(String),

    #[error("Unexpected DESCRIBE output for table '{0}'.")]
    InvalidDescribeRow(String),

    #[error("No value supplied for column '{column}' of table '{table}'.")]
    MissingColumn { table: String, column: String },

    #[error("Row for table '{table}' has {found} values, expected {expected}.")]
    RowWidth {
        table: String,
        expected: usize,
        found: usize,
    },
}
