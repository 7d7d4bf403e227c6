//! Configuration types for parses and parser plugins.
//!
//! - [`ParseOptions`] - per-invocation settings, built fresh for each parse
//! - [`StreamingConfig`] - per-plugin buffer and limit settings
//!
//! # Example
//!
//! ```rust
//! use chatimport::config::{ParseOptions, StreamingConfig};
//! use chatimport::progress::log_progress;
//!
//! let options = ParseOptions::new("export.json")
//!     .with_batch_size(1000)
//!     .with_progress(log_progress());
//!
//! let config = StreamingConfig::new()
//!     .with_buffer_size(128 * 1024)
//!     .with_header_bytes(8 * 1024);
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ImportError, Result};
use crate::progress::ProgressCallback;

/// Default number of messages per emitted batch.
pub const DEFAULT_BATCH_SIZE: usize = 5000;

/// Per-invocation parse settings.
#[derive(Clone)]
pub struct ParseOptions {
    /// The export file to parse.
    pub file_path: PathBuf,

    /// Number of messages per `messages` event (default: 5000).
    pub batch_size: usize,

    /// Side channel receiving a copy of every progress event.
    pub on_progress: Option<ProgressCallback>,
}

impl ParseOptions {
    /// Creates options for the given file with default batch size and no
    /// progress callback.
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            on_progress: None,
        }
    }

    /// Sets the batch size.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets the progress callback.
    #[must_use]
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Checks the options before any input is read.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::InvalidOptions`] if `batch_size` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(ImportError::invalid_options("batch size must be positive"));
        }
        Ok(())
    }
}

impl fmt::Debug for ParseOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseOptions")
            .field("file_path", &self.file_path)
            .field("batch_size", &self.batch_size)
            .field("on_progress", &self.on_progress.as_ref().map(|_| ".."))
            .finish()
    }
}

/// Buffer sizes and limits used by the streaming pipeline.
///
/// # Examples
///
/// ```
/// use chatimport::config::StreamingConfig;
///
/// let config = StreamingConfig::new()
///     .with_buffer_size(128 * 1024)  // 128KB buffer
///     .with_max_record_size(1024 * 1024);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamingConfig {
    /// Buffer size for file reading.
    ///
    /// Default: 64KB. Larger buffers improve throughput but use more memory.
    pub buffer_size: usize,

    /// Size of the prefix searched for the header fragment.
    ///
    /// Default: 16KB. The header must appear before the record array.
    pub header_bytes: usize,

    /// Maximum size of a single record in bytes.
    ///
    /// Default: 10MB. A larger record aborts the parse.
    pub max_record_size: usize,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            buffer_size: 64 * 1024,            // 64KB
            header_bytes: 16 * 1024,           // 16KB
            max_record_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

impl StreamingConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the buffer size.
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Sets the header prefix size.
    #[must_use]
    pub fn with_header_bytes(mut self, size: usize) -> Self {
        self.header_bytes = size;
        self
    }

    /// Sets the maximum record size.
    #[must_use]
    pub fn with_max_record_size(mut self, size: usize) -> Self {
        self.max_record_size = size;
        self
    }
}
