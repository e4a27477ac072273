//! Error types for docqa.
//!
//! One enum covers the whole retrieval-augmented answering workflow: mode
//! violations, bad arguments, storage/search failures, generation failures,
//! plus the configuration, prompt, I/O and serialization errors around them.

use thiserror::Error;

/// Unified error type for docqa.
///
/// Every fallible operation returns `Result<T, AppError>`. Nothing is retried
/// or swallowed on the way up; the caller decides what to do.
#[derive(Error, Debug)]
pub enum AppError {
    /// A query operation was called on a service built for ingestion
    #[error("Invalid mode: {0}")]
    InvalidMode(String),

    /// Malformed argument (k < 1, mismatched lengths or dimensions)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Vector index / document store failure, or no documents retrieved
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// Language model failure or empty output
    #[error("Generation error: {0}")]
    Generation(String),

    /// Embedding service failure
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Prompt template errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        AppError::Retrieval(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefixes() {
        let err = AppError::InvalidMode("service was built for ingestion".to_string());
        assert_eq!(err.to_string(), "Invalid mode: service was built for ingestion");

        let err = AppError::Generation("empty response".to_string());
        assert!(err.to_string().starts_with("Generation error"));
    }

    #[test]
    fn test_sqlite_errors_map_to_retrieval() {
        let err: AppError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, AppError::Retrieval(_)));
    }

    #[test]
    fn test_json_errors_map_to_serialization() {
        let err: AppError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, AppError::Serialization(_)));
    }
}
