//! Format detection and plugin lookup.
//!
//! The registry owns every known [`FormatParser`] and picks the right one for
//! a candidate file by evaluating feature signatures against a bounded file
//! prefix. The file itself is never read past that prefix during detection.
//!
//! # Selection
//!
//! 1. Features whose extension list rejects the file are skipped.
//! 2. Every remaining feature is tested with [`FormatParser::matches`].
//! 3. Among matches the highest priority wins; on a tie, the feature that
//!    was registered first wins.
//!
//! # Example
//!
//! ```rust,no_run
//! use chatimport::registry::default_registry;
//!
//! let registry = default_registry()?;
//! match registry.detect("export.json")? {
//!     Some(parser) => println!("detected {}", parser.feature().id()),
//!     None => println!("format not recognized"),
//! }
//! # Ok::<(), chatimport::ImportError>(())
//! ```

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{ImportError, Result};
use crate::feature::FormatFeature;
use crate::parser::FormatParser;
use crate::parsers::builtin_parsers;

/// Default number of prefix bytes read for detection.
pub const DEFAULT_DETECT_BYTES: usize = 4096;

/// Lookup table of format plugins keyed by feature id.
pub struct FormatRegistry {
    /// Registration order
    parsers: Vec<Box<dyn FormatParser>>,
    /// Feature id -> index into `parsers`
    index: HashMap<String, usize>,
    detect_bytes: usize,
}

impl FormatRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            parsers: Vec::new(),
            index: HashMap::new(),
            detect_bytes: DEFAULT_DETECT_BYTES,
        }
    }

    /// Sets how many prefix bytes [`detect`](Self::detect) reads.
    #[must_use]
    pub fn with_detect_bytes(mut self, bytes: usize) -> Self {
        self.detect_bytes = bytes.max(1);
        self
    }

    /// Adds a plugin.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::DuplicateFeature`] if a plugin with the same
    /// feature id is already registered.
    pub fn register(&mut self, parser: Box<dyn FormatParser>) -> Result<()> {
        let id = parser.feature().id().to_string();
        if self.index.contains_key(&id) {
            return Err(ImportError::DuplicateFeature { id });
        }
        tracing::debug!(id = %id, priority = parser.feature().priority(), "registered format");
        self.index.insert(id, self.parsers.len());
        self.parsers.push(parser);
        Ok(())
    }

    /// Looks up a plugin by feature id.
    pub fn get(&self, id: &str) -> Option<&dyn FormatParser> {
        self.index.get(id).map(|&i| self.parsers[i].as_ref())
    }

    /// Returns all features in registration order.
    pub fn features(&self) -> impl Iterator<Item = &FormatFeature> {
        self.parsers.iter().map(|p| p.feature())
    }

    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }

    pub fn detect_bytes(&self) -> usize {
        self.detect_bytes
    }

    /// Detects the format of a file from its first bytes.
    ///
    /// Returns `Ok(None)` if no feature matches.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::Io`] if the file cannot be opened or read.
    pub fn detect(&self, path: impl AsRef<Path>) -> Result<Option<&dyn FormatParser>> {
        let path = path.as_ref();
        let mut head = Vec::with_capacity(self.detect_bytes);
        File::open(path)?
            .take(self.detect_bytes as u64)
            .read_to_end(&mut head)?;

        Ok(self.detect_head(path, &String::from_utf8_lossy(&head)))
    }

    /// Selects a plugin for an already captured file prefix.
    pub fn detect_head(&self, path: &Path, head: &str) -> Option<&dyn FormatParser> {
        let mut best: Option<&dyn FormatParser> = None;

        for parser in &self.parsers {
            let feature = parser.feature();
            if !feature.accepts_extension(path) || !parser.matches(head) {
                continue;
            }
            // Strictly greater keeps the earlier registration on a tie.
            if best.is_none_or(|b| feature.priority() > b.feature().priority()) {
                best = Some(parser.as_ref());
            }
        }

        match best {
            Some(parser) => {
                tracing::debug!(path = %path.display(), format = parser.feature().id(), "detected format");
            }
            None => tracing::debug!(path = %path.display(), "no format matched"),
        }
        best
    }

    /// Like [`detect`](Self::detect), but a missing match is an error.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::UnrecognizedFormat`] if no feature matches, or
    /// [`ImportError::Io`] if the file cannot be read.
    pub fn require(&self, path: impl AsRef<Path>) -> Result<&dyn FormatParser> {
        let path = path.as_ref();
        self.detect(path)?
            .ok_or_else(|| ImportError::unrecognized(path))
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatRegistry")
            .field("features", &self.features().map(FormatFeature::id).collect::<Vec<_>>())
            .field("detect_bytes", &self.detect_bytes)
            .finish()
    }
}

/// Creates a registry holding every built-in plugin.
///
/// # Errors
///
/// Returns an error if a built-in plugin fails to initialize.
pub fn default_registry() -> Result<FormatRegistry> {
    let mut registry = FormatRegistry::new();
    for parser in builtin_parsers()? {
        registry.register(parser)?;
    }
    Ok(registry)
}
