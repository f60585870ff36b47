use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request to the chart API failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("The chart API returned an error: {0}")]
    ApiError(String),

    #[error("Failed to deserialize the chart response: {0}")]
    Deserialization(String),

    #[error("Invalid data in the chart response: {0}")]
    InvalidData(String),

    #[error("No price data found for symbol '{0}'")]
    SymbolNotFound(String),
}
