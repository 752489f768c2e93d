//! Error types for population and intensity file operations.

use thiserror::Error;

/// Errors that can occur while importing or exporting files.
#[derive(Error, Debug)]
pub enum FormatError {
    /// I/O error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV parsing or writing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Invalid format structure or content
    #[error("Invalid format: {message}")]
    InvalidFormat {
        /// Description of the format error
        message: String,
    },

    /// Operation not supported by this format
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),
}

impl FormatError {
    /// Create an invalid format error with a message.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }
}

impl From<csv::IntoInnerError<csv::Writer<Vec<u8>>>> for FormatError {
    fn from(e: csv::IntoInnerError<csv::Writer<Vec<u8>>>) -> Self {
        Self::Io(e.into_error())
    }
}

impl From<std::string::FromUtf8Error> for FormatError {
    fn from(e: std::string::FromUtf8Error) -> Self {
        Self::invalid_format(format!("output is not valid UTF-8: {}", e))
    }
}
