use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Database error: {0}")]
    Database(#[from] database::DbError),

    #[error("Invalid input data: {0}")]
    Core(#[from] core_types::CoreError),

    #[error("Market data request failed: {0}")]
    Api(#[from] api_client::error::ApiError),

    #[error("Failed to read the delimited input file: {0}")]
    Csv(#[from] csv::Error),
}
