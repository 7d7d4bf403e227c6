//! Raw-input repair applied before structural decoding.
//!
//! A [`Preprocessor`] wraps the byte stream of an export in a reader that
//! fixes structural defects of a known-bad exporter variant. It must keep the
//! logical format and the record semantics intact; it only makes the input
//! decodable. Plugins without a hook use [`Identity`].
//!
//! # Example
//!
//! ```rust
//! use chatimport::preprocess::{ExportRepair, Preprocessor};
//!
//! // Raw newline inside a string literal, as written by some exporters
//! let broken = b"{\"content\": \"line1\nline2\"}";
//! let fixed = ExportRepair.apply_to_bytes(broken).unwrap();
//!
//! let value: serde_json::Value = serde_json::from_slice(&fixed).unwrap();
//! assert_eq!(value["content"], "line1\nline2");
//! ```

use std::io::{self, Read};

/// Byte stream handed to a preprocessor and returned from it.
pub type SourceReader<'a> = Box<dyn Read + Send + 'a>;

/// A transform from raw input to corrected raw input of the same format.
pub trait Preprocessor: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Wraps a byte stream in the corrected stream.
    fn wrap<'a>(&self, input: SourceReader<'a>) -> SourceReader<'a>;

    /// Applies the transform to an in-memory buffer.
    fn apply_to_bytes(&self, input: &[u8]) -> io::Result<Vec<u8>> {
        let mut out = Vec::with_capacity(input.len());
        self.wrap(Box::new(input)).read_to_end(&mut out)?;
        Ok(out)
    }
}

/// The do-nothing preprocessor.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

/// Shared [`Identity`] instance returned by the default plugin hook.
pub static IDENTITY: Identity = Identity;

impl Preprocessor for Identity {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn wrap<'a>(&self, input: SourceReader<'a>) -> SourceReader<'a> {
        input
    }
}

/// Repairs JSON written by exporters that skip string escaping.
///
/// - strips a leading UTF-8 byte order mark
/// - escapes raw control characters (`U+0000`..`U+001F`) found inside string
///   literals, so `"a<LF>b"` becomes `"a\nb"`
///
/// Bytes outside string literals pass through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportRepair;

impl Preprocessor for ExportRepair {
    fn name(&self) -> &'static str {
        "export-repair"
    }

    fn wrap<'a>(&self, input: SourceReader<'a>) -> SourceReader<'a> {
        Box::new(RepairReader::new(input))
    }
}

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const CHUNK_SIZE: usize = 8 * 1024;

#[derive(Debug, Default)]
struct LexState {
    in_string: bool,
    escaped: bool,
}

impl LexState {
    fn repair_into(&mut self, input: &[u8], out: &mut Vec<u8>) {
        for &b in input {
            if !self.in_string {
                if b == b'"' {
                    self.in_string = true;
                }
                out.push(b);
                continue;
            }

            if self.escaped {
                self.escaped = false;
                out.push(b);
            } else if b == b'\\' {
                self.escaped = true;
                out.push(b);
            } else if b == b'"' {
                self.in_string = false;
                out.push(b);
            } else if b < 0x20 {
                match b {
                    b'\n' => out.extend_from_slice(b"\\n"),
                    b'\r' => out.extend_from_slice(b"\\r"),
                    b'\t' => out.extend_from_slice(b"\\t"),
                    _ => out.extend_from_slice(format!("\\u{:04x}", b).as_bytes()),
                }
            } else {
                out.push(b);
            }
        }
    }
}

/// Reader adapter behind [`ExportRepair`].
struct RepairReader<R> {
    inner: R,
    chunk: Box<[u8]>,
    out: Vec<u8>,
    pos: usize,
    state: LexState,
    at_start: bool,
}

impl<R: Read> RepairReader<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            chunk: vec![0; CHUNK_SIZE].into_boxed_slice(),
            out: Vec::with_capacity(CHUNK_SIZE),
            pos: 0,
            state: LexState::default(),
            at_start: true,
        }
    }

    /// Refills `out`. Returns `false` at end of input.
    fn refill(&mut self) -> io::Result<bool> {
        self.out.clear();
        self.pos = 0;

        let n = self.inner.read(&mut self.chunk)?;
        if n == 0 {
            return Ok(false);
        }

        let mut input = &self.chunk[..n];
        if self.at_start {
            self.at_start = false;
            input = input.strip_prefix(UTF8_BOM).unwrap_or(input);
        }
        self.state.repair_into(input, &mut self.out);
        Ok(true)
    }
}

impl<R: Read> Read for RepairReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        // A chunk consisting only of a BOM leaves `out` empty, so loop.
        while self.pos >= self.out.len() {
            if !self.refill()? {
                return Ok(0);
            }
        }

        let available = &self.out[self.pos..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.pos += n;
        Ok(n)
    }
}
