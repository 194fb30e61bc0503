//! Unit tests for error handling
//!
//! Tests error types, conversions, and retry classification.

#[cfg(test)]
mod tests {
    use std::io;

    use crate::errors::JokeError;

    // ====== Error Type Tests ======

    #[test]
    fn test_not_found_display() {
        let error = JokeError::NotFound(999);
        assert_eq!(format!("{error}"), "Joke not found: id 999");
    }

    #[test]
    fn test_duplicate_id_display() {
        let error = JokeError::DuplicateId(7);
        assert!(format!("{error}").contains("id 7"));
    }

    #[test]
    fn test_invalid_input_is_client_error() {
        let error = JokeError::InvalidInput("query must not be empty".to_string());
        assert!(error.is_client_error());
        assert!(!error.is_retryable());
    }

    // ====== Retry Classification Tests ======

    #[test]
    fn test_dependency_unavailable_is_retryable() {
        let error = JokeError::DependencyUnavailable("embedding timed out".to_string());
        assert!(error.is_retryable());
        assert!(!error.is_client_error());
    }

    #[test]
    fn test_pool_timeout_is_retryable() {
        let error: JokeError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(error, JokeError::Database(_)));
        assert!(error.is_retryable());
    }

    #[test]
    fn test_row_not_found_is_not_retryable() {
        let error: JokeError = sqlx::Error::RowNotFound.into();
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_config_error_not_retryable() {
        let error = JokeError::Config("weights must sum to 1".to_string());
        assert!(!error.is_retryable());
        assert!(format!("{error}").contains("Configuration"));
    }

    // ====== Error Conversion Tests ======

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let err: JokeError = io_err.into();
        assert!(matches!(err, JokeError::Io(_)));
    }

    #[test]
    fn test_error_from_serde_json() {
        let parse_result: Result<serde_json::Value, _> = serde_json::from_str("{invalid json}");
        if let Err(json_err) = parse_result {
            let err: JokeError = json_err.into();
            assert!(matches!(err, JokeError::Serialization(_)));
        }
    }

    #[test]
    fn test_error_from_toml() {
        let parse_result: Result<toml::Value, _> = toml::from_str("= broken");
        if let Err(toml_err) = parse_result {
            let err: JokeError = toml_err.into();
            assert!(matches!(err, JokeError::TomlParsing(_)));
        }
    }

    #[test]
    fn test_error_debug_format() {
        let error = JokeError::Embedding("dimension mismatch".to_string());
        assert!(format!("{error:?}").contains("Embedding"));
    }
}
