use thiserror::Error;

/// Top-level error type for the release assistant.
///
/// Subsystem crates either return this directly or define their own error
/// type with a `From<ReleasebotError>` conversion so that `?` works across
/// crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReleasebotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Corpus parse error: {0}")]
    Parse(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Refresh error: {0}")]
    Refresh(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for ReleasebotError {
    fn from(err: toml::de::Error) -> Self {
        ReleasebotError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ReleasebotError {
    fn from(err: toml::ser::Error) -> Self {
        ReleasebotError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ReleasebotError {
    fn from(err: serde_json::Error) -> Self {
        ReleasebotError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for release assistant operations.
pub type Result<T> = std::result::Result<T, ReleasebotError>;
