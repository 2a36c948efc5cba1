/*
[INPUT]:  Error sources (backend HTTP, reader capability, serialization, validation)
[OUTPUT]: Structured error types shared by the backend client and reader layer
[POS]:    Error handling layer - unified error types for entire crate
[UPDATE]: When adding new error sources or improving error messages
*/

use reqwest::StatusCode;
use thiserror::Error;

/// Main error type for the terminal POS adapter
#[derive(Error, Debug)]
pub enum TerminalError {
    /// Payments backend answered with a non-2xx status
    #[error("Request Failed ({status}): {body}")]
    BackendRequestFailed { status: u16, body: String },

    /// Reader capability call returned an error
    #[error("Reader operation failed: {message}")]
    ReaderOperationFailed {
        code: Option<String>,
        message: String,
    },

    /// Required user input missing or malformed
    #[error("Validation error: {0}")]
    Validation(String),

    /// HTTP transport failed before a response was received
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Response decoded but is missing something the caller needs
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl TerminalError {
    /// Create a backend error from status code and response body
    pub fn backend_failed(status: StatusCode, body: impl Into<String>) -> Self {
        TerminalError::BackendRequestFailed {
            status: status.as_u16(),
            body: body.into(),
        }
    }

    /// Create a reader error without an SDK error code
    pub fn reader(message: impl Into<String>) -> Self {
        TerminalError::ReaderOperationFailed {
            code: None,
            message: message.into(),
        }
    }

    /// Create a reader error carrying the SDK error code
    pub fn reader_with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        TerminalError::ReaderOperationFailed {
            code: Some(code.into()),
            message: message.into(),
        }
    }

    /// Check if the error came from the payments backend
    pub fn is_backend_error(&self) -> bool {
        matches!(
            self,
            TerminalError::BackendRequestFailed { .. }
                | TerminalError::Http(_)
                | TerminalError::Serialization(_)
                | TerminalError::InvalidResponse(_)
        )
    }

    /// Check if the error came from the reader
    pub fn is_reader_error(&self) -> bool {
        matches!(self, TerminalError::ReaderOperationFailed { .. })
    }

    /// SDK error code, if the reader supplied one
    pub fn reader_code(&self) -> Option<&str> {
        match self {
            TerminalError::ReaderOperationFailed { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

/// Result type alias for terminal POS operations
pub type Result<T> = std::result::Result<T, TerminalError>;
