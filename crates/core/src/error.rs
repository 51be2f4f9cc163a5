//! Error types for the sonar pipeline.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the sonar pipeline.
///
/// Individual malformed rows never surface here; they are reported as
/// [`crate::RowOutcome`] values instead.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The combined input held no records.
    #[error("No data: {0}")]
    NoData(String),

    /// A required column is absent from every record.
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// Input cannot be interpreted as order records at all.
    #[error("Schema error: {0}")]
    Schema(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Unexpected internal failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a no-data error.
    pub fn no_data(msg: impl Into<String>) -> Self {
        Error::NoData(msg.into())
    }

    /// Create a missing column error.
    pub fn missing_column(column: impl Into<String>) -> Self {
        Error::MissingColumn(column.into())
    }

    /// Create a schema error.
    pub fn schema(msg: impl Into<String>) -> Self {
        Error::Schema(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    /// Whether this error means "nothing to process" rather than bad input.
    pub fn is_no_data(&self) -> bool {
        matches!(self, Error::NoData(_))
    }

    /// Whether this error means the input itself was malformed.
    pub fn is_malformed_input(&self) -> bool {
        matches!(self, Error::MissingColumn(_) | Error::Schema(_) | Error::Json(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert!(Error::no_data("empty").is_no_data());
        assert!(Error::missing_column("Expiry").is_malformed_input());
        assert!(!Error::internal("boom").is_malformed_input());
        assert!(!Error::internal("boom").is_no_data());
    }

    #[test]
    fn test_error_display() {
        let err = Error::missing_column("Trade Date");
        assert_eq!(err.to_string(), "Missing column: Trade Date");
    }
}
