use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from file: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("{section} not found in the {file} file")]
    SectionMissing { section: String, file: String },

    #[error("Key '{key}' is missing from the [{section}] section")]
    MissingKey { section: String, key: String },

    #[error("Configuration validation error: {0}")]
    ValidationError(String),
}
