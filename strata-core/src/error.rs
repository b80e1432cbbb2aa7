//! # Error Handling
//!
//! Error types for Strata operations.
//!
//! ## Design Principles
//!
//! 1. **Actionable**: Every error should guide the user toward resolution
//! 2. **Contextual**: Errors include relevant context (file paths, values)
//! 3. **Recoverable**: Corrupt records are skipped, never fatal during recovery

use thiserror::Error;

/// Result type alias for Strata operations
pub type Result<T> = std::result::Result<T, Error>;

/// Primary error type for Strata
#[derive(Error, Debug)]
pub enum Error {
    // Validation errors
    #[error("invalid event: {reason}")]
    InvalidEvent { reason: String },

    #[error("invalid replay range: from={from} > to={to}")]
    InvalidRange { from: i64, to: i64 },

    // Storage errors
    #[error("WAL error: {message}")]
    WriteAheadLog {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("segment error: {message}")]
    Segment {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("manifest error: {message}")]
    Manifest { message: String },

    #[error("corrupt record: {message}")]
    Corrupt { message: String },

    // System errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        source: std::io::Error,
    },

    #[error("configuration error: {message}")]
    Configuration { message: String },
}

impl Error {
    /// Get error code for monitoring
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::InvalidEvent { .. } => "INVALID_EVENT",
            Error::InvalidRange { .. } => "INVALID_RANGE",
            Error::WriteAheadLog { .. } => "WAL_ERROR",
            Error::Segment { .. } => "SEGMENT_ERROR",
            Error::Manifest { .. } => "MANIFEST_ERROR",
            Error::Corrupt { .. } => "CORRUPT_RECORD",
            Error::Io { .. } => "IO_ERROR",
            Error::Configuration { .. } => "CONFIG_ERROR",
        }
    }

    /// Check if the error indicates caller misuse rather than a store fault
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidEvent { .. } | Error::InvalidRange { .. } | Error::Configuration { .. }
        )
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io {
            message: err.to_string(),
            source: err,
        }
    }
}
