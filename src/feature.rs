//! Static fingerprints of export formats.
//!
//! A [`FormatFeature`] describes how to recognise one export format from a
//! bounded prefix of the file:
//!
//! - `head` patterns: regular expressions that must all match the prefix
//! - `required_fields`: top-level keys that must all appear as `"key":`
//! - `extensions`: an advisory filter on the file suffix
//! - `priority`: tie-breaker when several features match
//!
//! Matching is all-or-nothing. There is no partial credit, and a feature
//! with no content signatures at all never matches.
//!
//! # Example
//!
//! ```rust
//! use chatimport::feature::FormatFeature;
//! use chatimport::parser::Platform;
//!
//! let feature = FormatFeature::builder("demo-json", "Demo JSON", Platform::Unknown)
//!     .priority(5)
//!     .extension("json")
//!     .head_pattern(r#""chat"\s*:\s*\{"#)
//!     .required_field("records")
//!     .build()
//!     .unwrap();
//!
//! assert!(feature.matches_head(r#"{"chat": {"id": 1}, "records": []}"#));
//! assert!(!feature.matches_head(r#"{"chat": {"id": 1}}"#));
//! ```

use std::path::Path;

use regex::Regex;

use crate::error::Result;
use crate::parser::Platform;

/// Signature conditions evaluated against a file prefix.
#[derive(Debug, Clone, Default)]
pub struct Signatures {
    head: Vec<Regex>,
    required_fields: Vec<String>,
    field_matchers: Vec<Regex>,
}

impl Signatures {
    /// Returns the compiled head patterns.
    pub fn head(&self) -> &[Regex] {
        &self.head
    }

    /// Returns the required top-level field names.
    pub fn required_fields(&self) -> &[String] {
        &self.required_fields
    }

    /// Returns `true` if no content condition is configured.
    pub fn is_empty(&self) -> bool {
        self.head.is_empty() && self.required_fields.is_empty()
    }

    fn matches(&self, head: &str) -> bool {
        if self.is_empty() {
            return false;
        }
        self.head.iter().all(|re| re.is_match(head))
            && self.field_matchers.iter().all(|re| re.is_match(head))
    }
}

/// Immutable fingerprint of one export format.
#[derive(Debug, Clone)]
pub struct FormatFeature {
    id: String,
    name: String,
    platform: Platform,
    priority: i32,
    extensions: Vec<String>,
    signatures: Signatures,
}

impl FormatFeature {
    /// Starts building a feature.
    pub fn builder(
        id: impl Into<String>,
        name: impl Into<String>,
        platform: Platform,
    ) -> FormatFeatureBuilder {
        FormatFeatureBuilder {
            id: id.into(),
            name: name.into(),
            platform,
            priority: 0,
            extensions: Vec::new(),
            head_patterns: Vec::new(),
            required_fields: Vec::new(),
        }
    }

    /// Unique identifier, also the registry key.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Higher wins when several features match the same file.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Accepted file suffixes, lowercase and without the dot.
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn signatures(&self) -> &Signatures {
        &self.signatures
    }

    /// Advisory suffix check.
    ///
    /// Rejects only files that have an extension not listed by the feature.
    /// Files without an extension, and features without an extension list,
    /// always pass.
    pub fn accepts_extension(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => {
                let ext = ext.to_lowercase();
                self.extensions.iter().any(|e| *e == ext)
            }
            None => true,
        }
    }

    /// Evaluates every signature condition against a file prefix.
    pub fn matches_head(&self, head: &str) -> bool {
        self.signatures.matches(head)
    }
}

/// Builder for [`FormatFeature`]. Patterns are compiled in [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct FormatFeatureBuilder {
    id: String,
    name: String,
    platform: Platform,
    priority: i32,
    extensions: Vec<String>,
    head_patterns: Vec<String>,
    required_fields: Vec<String>,
}

impl FormatFeatureBuilder {
    #[must_use]
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Adds an accepted file suffix (leading dot optional).
    #[must_use]
    pub fn extension(mut self, ext: impl AsRef<str>) -> Self {
        self.extensions
            .push(ext.as_ref().trim_start_matches('.').to_lowercase());
        self
    }

    /// Adds a regular expression that must match the file prefix.
    #[must_use]
    pub fn head_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.head_patterns.push(pattern.into());
        self
    }

    /// Adds a top-level field name that must appear in the file prefix.
    #[must_use]
    pub fn required_field(mut self, field: impl Into<String>) -> Self {
        self.required_fields.push(field.into());
        self
    }

    /// Compiles the signatures.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::InvalidPattern`](crate::ImportError::InvalidPattern)
    /// if a head pattern is not a valid regular expression.
    pub fn build(self) -> Result<FormatFeature> {
        let head = self
            .head_patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let field_matchers = self
            .required_fields
            .iter()
            .map(|f| Regex::new(&format!(r#""{}"\s*:"#, regex::escape(f))))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(FormatFeature {
            id: self.id,
            name: self.name,
            platform: self.platform,
            priority: self.priority,
            extensions: self.extensions,
            signatures: Signatures {
                head,
                required_fields: self.required_fields,
                field_matchers,
            },
        })
    }
}
