//! Incremental scanner for the record array of a JSON export.
//!
//! Exports are structured as:
//! ```json
//! {
//!   "session": {"...": "..."},
//!   "messages": [
//!     {"...": "..."},
//!     {"...": "..."}
//!   ]
//! }
//! ```
//!
//! The scanner walks the bytes once. It first finds the top-level key that
//! opens the record array, then hands out one raw element at a time. Only
//! the current element is buffered, so memory stays flat regardless of file
//! size. The scanner tracks string literals and nesting, which means braces
//! inside message text and same-named keys in nested objects are ignored.

use std::io::BufRead;

use crate::error::{ImportError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Seeking,
    InArray,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    Nothing,
    Colon,
    ArrayOpen,
}

/// Pull-based scanner over a JSON record array.
pub struct ArrayScanner<R> {
    reader: R,
    max_record_size: usize,
    state: ScanState,
    record: Vec<u8>,
    /// Nesting depth of the containers enclosing the array.
    outer_depth: u32,
}

impl<R: BufRead> ArrayScanner<R> {
    pub fn new(reader: R, max_record_size: usize) -> Self {
        Self {
            reader,
            max_record_size,
            state: ScanState::Seeking,
            record: Vec::new(),
            outer_depth: 0,
        }
    }

    /// Advances to the array stored under the top-level `key`.
    ///
    /// Returns `Ok(false)` if the input ends without such an array.
    pub fn seek_array(&mut self, key: &str) -> Result<bool> {
        let key = key.as_bytes();
        let mut depth = 0u32;
        let mut in_string = false;
        let mut escaped = false;
        let mut token = Vec::with_capacity(key.len() + 1);
        let mut expect = Expect::Nothing;

        while let Some(b) = self.next_byte()? {
            if in_string {
                if escaped {
                    escaped = false;
                } else if b == b'\\' {
                    escaped = true;
                } else if b == b'"' {
                    in_string = false;
                    if depth == 1 && token == key {
                        expect = Expect::Colon;
                    }
                    continue;
                }
                // Longer strings can never equal the key, stop collecting.
                if token.len() <= key.len() {
                    token.push(b);
                }
                continue;
            }

            match b {
                b' ' | b'\t' | b'\n' | b'\r' => {}
                b':' if expect == Expect::Colon => expect = Expect::ArrayOpen,
                b'[' if expect == Expect::ArrayOpen => {
                    self.state = ScanState::InArray;
                    self.outer_depth = depth;
                    return Ok(true);
                }
                b'"' => {
                    in_string = true;
                    token.clear();
                    expect = Expect::Nothing;
                }
                b'{' | b'[' => {
                    depth += 1;
                    expect = Expect::Nothing;
                }
                b'}' | b']' => {
                    depth = depth.saturating_sub(1);
                    expect = Expect::Nothing;
                }
                _ => expect = Expect::Nothing,
            }
        }

        self.state = ScanState::Finished;
        Ok(false)
    }

    /// Returns the raw bytes of the next array element, or `None` after the
    /// closing `]`.
    ///
    /// # Errors
    ///
    /// - [`ImportError::UnexpectedEof`] if input ends inside the array
    /// - [`ImportError::RecordTooLarge`] if an element exceeds the limit
    /// - [`ImportError::Io`] on read failure
    pub fn next_element(&mut self) -> Result<Option<&[u8]>> {
        if self.state != ScanState::InArray {
            return Ok(None);
        }
        self.record.clear();

        let first = loop {
            match self.next_byte()? {
                None => return Err(self.truncated("reading the record array")),
                Some(b' ' | b'\t' | b'\n' | b'\r' | b',') => {}
                Some(b']') => {
                    self.state = ScanState::Finished;
                    return Ok(None);
                }
                Some(b) => break b,
            }
        };

        self.record.push(first);
        match first {
            b'{' | b'[' => self.read_nested()?,
            b'"' => self.read_string_tail()?,
            _ => self.read_scalar_tail()?,
        }
        Ok(Some(&self.record))
    }

    /// Returns `true` once the closing `]` was consumed or the array was
    /// never found.
    pub fn is_finished(&self) -> bool {
        self.state == ScanState::Finished
    }

    /// Consumes the input after the closing `]`.
    ///
    /// The containers enclosing the array must close, and only whitespace
    /// may follow the top-level value. Returns `Ok(false)` on trailing
    /// content.
    ///
    /// # Errors
    ///
    /// - [`ImportError::UnexpectedEof`] if input ends before the enclosing
    ///   object closes
    /// - [`ImportError::Io`] on read failure
    pub fn finish_document(&mut self) -> Result<bool> {
        let mut depth = self.outer_depth;
        let mut in_string = false;
        let mut escaped = false;

        while depth > 0 {
            let Some(b) = self.next_byte()? else {
                return Err(ImportError::unexpected_eof("closing the export object"));
            };

            if in_string {
                if escaped {
                    escaped = false;
                } else if b == b'\\' {
                    escaped = true;
                } else if b == b'"' {
                    in_string = false;
                }
                continue;
            }

            match b {
                b'"' => in_string = true,
                b'{' | b'[' => depth += 1,
                b'}' | b']' => depth -= 1,
                _ => {}
            }
        }
        self.outer_depth = 0;

        while let Some(b) = self.next_byte()? {
            if !matches!(b, b' ' | b'\t' | b'\n' | b'\r') {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn read_nested(&mut self) -> Result<()> {
        let mut depth = 1u32;
        let mut in_string = false;
        let mut escaped = false;

        while depth > 0 {
            let b = self.require_byte()?;
            self.push(b)?;

            if in_string {
                if escaped {
                    escaped = false;
                } else if b == b'\\' {
                    escaped = true;
                } else if b == b'"' {
                    in_string = false;
                }
                continue;
            }

            match b {
                b'"' => in_string = true,
                b'{' | b'[' => depth += 1,
                b'}' | b']' => depth -= 1,
                _ => {}
            }
        }
        Ok(())
    }

    fn read_string_tail(&mut self) -> Result<()> {
        let mut escaped = false;
        loop {
            let b = self.require_byte()?;
            self.push(b)?;
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                return Ok(());
            }
        }
    }

    fn read_scalar_tail(&mut self) -> Result<()> {
        loop {
            let next = self.reader.fill_buf()?.first().copied();
            match next {
                None => return Err(self.truncated("reading a record")),
                Some(b',' | b']' | b' ' | b'\t' | b'\n' | b'\r') => return Ok(()),
                Some(b) => {
                    self.reader.consume(1);
                    self.push(b)?;
                }
            }
        }
    }

    fn push(&mut self, b: u8) -> Result<()> {
        self.record.push(b);
        if self.record.len() > self.max_record_size {
            return Err(ImportError::record_too_large(
                self.max_record_size,
                self.record.len(),
            ));
        }
        Ok(())
    }

    fn next_byte(&mut self) -> Result<Option<u8>> {
        let Some(&b) = self.reader.fill_buf()?.first() else {
            return Ok(None);
        };
        self.reader.consume(1);
        Ok(Some(b))
    }

    fn require_byte(&mut self) -> Result<u8> {
        match self.next_byte()? {
            Some(b) => Ok(b),
            None => Err(self.truncated("reading a record")),
        }
    }

    fn truncated(&mut self, context: &str) -> ImportError {
        self.state = ScanState::Finished;
        ImportError::unexpected_eof(context)
    }
}

/// Length of the JSON object or array at the start of `bytes`.
///
/// Braces inside string literals are skipped. Returns `None` if `bytes` does
/// not start with `{` or `[`, or the container does not close within it.
pub fn container_len(bytes: &[u8]) -> Option<usize> {
    if !matches!(bytes.first(), Some(b'{' | b'[')) {
        return None;
    }

    let mut depth = 0u32;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }

        match b {
            b'"' => in_string = true,
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}
