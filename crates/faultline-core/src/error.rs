//! Error types for faultline.
//!
//! One error enum covers the whole pipeline so that crate boundaries do not
//! force conversions. Variants are grouped by where they originate: data
//! loading, inference backends, storage, and configuration.

use thiserror::Error;

/// Errors that can occur across the faultline pipeline.
#[derive(Error, Debug)]
pub enum Error {
    /// Dataset loading or preprocessing failed (missing columns, malformed
    /// rows, no imputable category mode). Fatal for an ingestion run.
    #[error("Data error: {0}")]
    Data(String),

    /// An operation received empty input it cannot work with (blank query,
    /// blank text sent for embedding).
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// The embedding backend failed or returned an unusable response.
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// The chat backend failed or returned an unusable response. Interactive
    /// callers recover from this with a canned answer.
    #[error("Chat error: {0}")]
    Chat(String),

    /// A caller passed an argument outside its accepted range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// An insert collided with an existing unique key (incident number).
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// HTTP request failed before a response could be interpreted.
    #[error("Request error: {0}")]
    Request(String),

    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Request(err.to_string())
    }
}

/// Result type alias for faultline operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_error_display() {
        let err = Error::Data("missing required column 'description'".to_string());
        assert_eq!(
            err.to_string(),
            "Data error: missing required column 'description'"
        );
    }

    #[test]
    fn test_empty_input_error_display() {
        let err = Error::EmptyInput("query text is empty".to_string());
        assert_eq!(err.to_string(), "Empty input: query text is empty");
    }

    #[test]
    fn test_embedding_error_display() {
        let err = Error::Embedding("backend returned 503".to_string());
        assert_eq!(err.to_string(), "Embedding error: backend returned 503");
    }

    #[test]
    fn test_chat_error_display() {
        let err = Error::Chat("empty completion".to_string());
        assert_eq!(err.to_string(), "Chat error: empty completion");
    }

    #[test]
    fn test_invalid_argument_error_display() {
        let err = Error::InvalidArgument("tier level must be 1, 2, or 3".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid argument: tier level must be 1, 2, or 3"
        );
    }

    #[test]
    fn test_duplicate_key_error_display() {
        let err = Error::DuplicateKey("INC0000042".to_string());
        assert_eq!(err.to_string(), "Duplicate key: INC0000042");
    }

    #[test]
    fn test_serialization_error_display() {
        let err = Error::Serialization("unexpected end of input".to_string());
        assert_eq!(
            err.to_string(),
            "Serialization error: unexpected end of input"
        );
    }

    #[test]
    fn test_request_error_display() {
        let err = Error::Request("connection refused".to_string());
        assert_eq!(err.to_string(), "Request error: connection refused");
    }

    #[test]
    fn test_config_error_display() {
        let err = Error::Config("OPENAI_API_KEY not set".to_string());
        assert_eq!(err.to_string(), "Configuration error: OPENAI_API_KEY not set");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn test_result_type_ok() {
        let result: Result<i32> = Ok(42);
        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn test_result_type_err() {
        let result: Result<i32> = Err(Error::Data("bad row".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}
        assert_send::<Error>();
        assert_sync::<Error>();
    }

    #[test]
    fn test_error_debug_format() {
        let err = Error::Embedding("timeout".to_string());
        let debug = format!("{:?}", err);
        assert!(debug.contains("Embedding"));
        assert!(debug.contains("timeout"));
    }
}
