//! Streaming decode pipeline shared by all JSON-array exports.
//!
//! Chat exports routinely exceed a gigabyte, so nothing here loads a whole
//! file. The pipeline reads the file through a [`CountingReader`], lets the
//! plugin's preprocessor repair the raw bytes, pulls one record at a time out
//! of the bulk array with an [`ArrayScanner`], and turns records into
//! [`ParseEvent`](crate::event::ParseEvent)s.
//!
//! # Architecture
//!
//! - [`EventStream`] - the pull-based event sequence (one per parse)
//! - [`RecordDecoder`] - the format-specific part supplied by a plugin
//! - [`EventReceiver`] - the same sequence produced on a worker thread
//!
//! # Memory Usage
//!
//! Resident memory is bounded by the read buffer, the header window, the
//! largest single record and the buffered message batches. It does not grow
//! with the number of records beyond the batches and the member table.

mod channel;
mod pipeline;
mod scanner;
mod source;
mod traits;

pub use channel::EventReceiver;
pub use pipeline::EventStream;
pub use scanner::{ArrayScanner, container_len};
pub use source::{ByteCounter, CountingReader};
pub use traits::RecordDecoder;
