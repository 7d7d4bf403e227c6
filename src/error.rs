//! Unified error types for chatimport.
//!
//! This module provides a single [`ImportError`] enum that covers every error
//! case in the library. Most callers never see it directly: once a parse has
//! started, a fatal error is folded into the terminal
//! [`ParseEvent::Error`](crate::event::ParseEvent::Error) of the event stream.
//! It surfaces as a plain `Result` only from setup paths such as registry
//! construction and format detection.
//!
//! # Error Taxonomy
//!
//! - **Stream faults** (`Io`, `Json`, `InvalidFormat`, `UnexpectedEof`,
//!   `RecordTooLarge`) terminate a parse.
//! - **No-match** (`UnrecognizedFormat`) means no registered feature claimed
//!   the file. It is not a parse error.
//! - **Setup** (`DuplicateFeature`, `InvalidPattern`, `InvalidOptions`) come
//!   from misconfiguration.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A specialized [`Result`] type for chatimport operations.
///
/// # Example
///
/// ```rust
/// use chatimport::error::Result;
/// use chatimport::message::ParsedMessage;
///
/// fn my_function() -> Result<Vec<ParsedMessage>> {
///     Ok(vec![])
/// }
/// ```
pub type Result<T> = std::result::Result<T, ImportError>;

/// The error type for all chatimport operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ImportError {
    /// An I/O error occurred while opening or reading the export.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The structural decoder rejected a record.
    ///
    /// Raised when a record in the bulk array is not syntactically valid JSON.
    /// Records that are valid JSON but miss required fields are dropped
    /// silently instead.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The file does not have the structure the plugin expects.
    #[error("Invalid {format} format: {message}")]
    InvalidFormat {
        /// The format that was expected
        format: &'static str,
        /// Description of what's wrong
        message: String,
    },

    /// The file ended in the middle of the record array.
    #[error("Unexpected end of file while {context}")]
    UnexpectedEof {
        /// What the decoder was reading when input ran out
        context: String,
    },

    /// A single record exceeded the configured maximum size.
    #[error("Record too large: {actual_size} bytes (maximum: {max_size} bytes)")]
    RecordTooLarge {
        /// Maximum allowed size in bytes
        max_size: usize,
        /// Size reached before giving up
        actual_size: usize,
    },

    /// No registered format feature matched the file.
    #[error("Format not recognized: {}", path.display())]
    UnrecognizedFormat {
        /// The candidate file
        path: PathBuf,
    },

    /// Two plugins tried to register the same feature id.
    #[error("Format feature '{id}' is already registered")]
    DuplicateFeature {
        /// The conflicting feature id
        id: String,
    },

    /// A signature pattern failed to compile.
    #[error("Invalid signature pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Parse options were rejected before any input was read.
    #[error("Invalid parse options: {message}")]
    InvalidOptions {
        /// Description of the rejected option
        message: String,
    },
}

// ============================================================================
// Convenience constructors
// ============================================================================

impl ImportError {
    /// Creates an invalid format error.
    pub fn invalid_format(format: &'static str, message: impl Into<String>) -> Self {
        ImportError::InvalidFormat {
            format,
            message: message.into(),
        }
    }

    /// Creates an unexpected EOF error.
    pub fn unexpected_eof(context: impl Into<String>) -> Self {
        ImportError::UnexpectedEof {
            context: context.into(),
        }
    }

    /// Creates a record-too-large error.
    pub fn record_too_large(max_size: usize, actual_size: usize) -> Self {
        ImportError::RecordTooLarge {
            max_size,
            actual_size,
        }
    }

    /// Creates a no-match error for the given candidate file.
    pub fn unrecognized(path: impl Into<PathBuf>) -> Self {
        ImportError::UnrecognizedFormat { path: path.into() }
    }

    /// Creates an invalid options error.
    pub fn invalid_options(message: impl Into<String>) -> Self {
        ImportError::InvalidOptions {
            message: message.into(),
        }
    }

    /// Returns `true` if this is an IO error.
    pub fn is_io(&self) -> bool {
        matches!(self, ImportError::Io(_))
    }

    /// Returns `true` if no registered format matched.
    pub fn is_unrecognized(&self) -> bool {
        matches!(self, ImportError::UnrecognizedFormat { .. })
    }

    /// Returns `true` for faults raised by the byte stream or the structural
    /// decoder while a parse is running.
    pub fn is_stream_fault(&self) -> bool {
        matches!(
            self,
            ImportError::Io(_)
                | ImportError::Json(_)
                | ImportError::InvalidFormat { .. }
                | ImportError::UnexpectedEof { .. }
                | ImportError::RecordTooLarge { .. }
        )
    }
}
