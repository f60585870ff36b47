use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),
}
