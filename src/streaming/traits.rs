//! The format-specific half of a streaming parse.
//!
//! [`EventStream`](super::EventStream) handles everything that is the same
//! for every JSON-array export (I/O, scanning, batching, member tracking,
//! event order, progress). A plugin supplies a [`RecordDecoder`] for the rest.

use std::path::Path;

use serde_json::Value;

use crate::message::{ParsedMessage, ParsedMeta};

/// Decodes the header and the records of one export format.
///
/// Both methods are total: a bad header yields default metadata and a bad
/// record yields `None`. Neither may abort the parse.
pub trait RecordDecoder: Send {
    /// Human-readable format name, used in error messages.
    fn format_name(&self) -> &'static str;

    /// Top-level key of the bulk record array.
    fn records_key(&self) -> &str;

    /// Derives conversation metadata from the file prefix.
    ///
    /// `head` is the start of the (preprocessed) file, possibly cut in the
    /// middle of a token. `path` is available for fallback naming.
    fn decode_meta(&self, head: &str, path: &Path) -> ParsedMeta;

    /// Validates and normalizes one raw record.
    ///
    /// Returns `None` to drop the record silently.
    fn normalize(&self, record: Value) -> Option<ParsedMessage>;
}
