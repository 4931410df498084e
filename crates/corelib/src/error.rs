use std::fmt;

/// Custom error type for commenter operations
#[derive(Debug)]
pub enum CommenterError {
    /// Configuration error (missing or invalid environment variable)
    ConfigError(String),

    /// The current build has no resolvable pull request number
    NotAPullRequest,

    /// The report file could not be opened
    ReportNotFound(String),

    /// The report file could not be decoded against any supported shape
    ReportMalformed(String),

    /// Error reported by the hosting API
    ApiError(String),

    /// IO error
    IoError(std::io::Error),

    /// JSON serialization error
    JsonError(serde_json::Error),

    /// HTTP client error
    HttpError(reqwest::Error),
}

impl fmt::Display for CommenterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommenterError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            CommenterError::NotAPullRequest => write!(f, "not a pull request build"),
            CommenterError::ReportNotFound(msg) => write!(f, "Report not found: {}", msg),
            CommenterError::ReportMalformed(msg) => write!(f, "Report malformed: {}", msg),
            CommenterError::ApiError(msg) => write!(f, "API error: {}", msg),
            CommenterError::IoError(err) => write!(f, "IO error: {}", err),
            CommenterError::JsonError(err) => write!(f, "JSON error: {}", err),
            CommenterError::HttpError(err) => write!(f, "HTTP error: {}", err),
        }
    }
}

impl std::error::Error for CommenterError {}

impl From<std::io::Error> for CommenterError {
    fn from(err: std::io::Error) -> Self {
        CommenterError::IoError(err)
    }
}

impl From<serde_json::Error> for CommenterError {
    fn from(err: serde_json::Error) -> Self {
        CommenterError::JsonError(err)
    }
}

impl From<reqwest::Error> for CommenterError {
    fn from(err: reqwest::Error) -> Self {
        CommenterError::HttpError(err)
    }
}

/// Result type for commenter operations
pub type Result<T> = std::result::Result<T, CommenterError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_config_error() {
        let error = CommenterError::ConfigError("Test error".to_string());
        assert_eq!(error.to_string(), "Configuration error: Test error");
    }

    #[test]
    fn test_not_a_pull_request() {
        let error = CommenterError::NotAPullRequest;
        assert_eq!(error.to_string(), "not a pull request build");
    }

    #[test]
    fn test_report_not_found() {
        let error = CommenterError::ReportNotFound("Test error".to_string());
        assert_eq!(error.to_string(), "Report not found: Test error");
    }

    #[test]
    fn test_report_malformed() {
        let error = CommenterError::ReportMalformed("Test error".to_string());
        assert_eq!(error.to_string(), "Report malformed: Test error");
    }

    #[test]
    fn test_api_error() {
        let error = CommenterError::ApiError("Test error".to_string());
        assert_eq!(error.to_string(), "API error: Test error");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let error: CommenterError = io_error.into();
        assert!(matches!(error, CommenterError::IoError(_)));
    }

    #[test]
    fn test_error_source() {
        let error = CommenterError::ReportNotFound("Test error".to_string());
        assert!(error.source().is_none());
    }
}
