//! Plugin contract for chat export formats.
//!
//! Every supported export format is one type implementing [`FormatParser`]:
//! it advertises a static [`FormatFeature`] fingerprint, optionally a
//! [`Preprocessor`] that repairs raw bytes, and a `parse` entry point that
//! returns a lazily-driven [`EventStream`].
//!
//! # Example
//!
//! ```rust,no_run
//! use chatimport::config::ParseOptions;
//! use chatimport::event::ParseEvent;
//! use chatimport::registry::default_registry;
//!
//! # fn main() -> chatimport::Result<()> {
//! let registry = default_registry()?;
//! let parser = registry.require("chat_export.json")?;
//!
//! for event in parser.parse(ParseOptions::new("chat_export.json")) {
//!     if let ParseEvent::Messages { messages } = event {
//!         println!("{} messages", messages.len());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};

use crate::config::ParseOptions;
use crate::feature::FormatFeature;
use crate::preprocess::{IDENTITY, Preprocessor};
use crate::streaming::EventStream;

/// Supported messaging platforms.
///
/// # Example
///
/// ```rust
/// use chatimport::parser::Platform;
/// use std::str::FromStr;
///
/// let platform = Platform::from_str("wx").unwrap();
/// assert_eq!(platform, Platform::WeChat);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum Platform {
    #[serde(alias = "wx")]
    WeChat,
    QQ,
    #[serde(alias = "tg")]
    Telegram,
    #[serde(alias = "wa")]
    WhatsApp,
    #[serde(alias = "dc")]
    Discord,
    #[serde(alias = "ig")]
    Instagram,
    Line,
    /// Exports whose platform cannot be determined.
    Unknown,
}

impl Platform {
    /// Returns all platform names including aliases.
    pub fn all_names() -> &'static [&'static str] {
        &[
            "wechat", "wx", "qq", "telegram", "tg", "whatsapp", "wa", "discord", "dc",
            "instagram", "ig", "line", "unknown",
        ]
    }

    /// Returns all available platforms.
    pub fn all() -> &'static [Platform] {
        &[
            Platform::WeChat,
            Platform::QQ,
            Platform::Telegram,
            Platform::WhatsApp,
            Platform::Discord,
            Platform::Instagram,
            Platform::Line,
            Platform::Unknown,
        ]
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::WeChat => write!(f, "WeChat"),
            Platform::QQ => write!(f, "QQ"),
            Platform::Telegram => write!(f, "Telegram"),
            Platform::WhatsApp => write!(f, "WhatsApp"),
            Platform::Discord => write!(f, "Discord"),
            Platform::Instagram => write!(f, "Instagram"),
            Platform::Line => write!(f, "LINE"),
            Platform::Unknown => write!(f, "Unknown"),
        }
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "wechat" | "wx" => Ok(Platform::WeChat),
            "qq" => Ok(Platform::QQ),
            "telegram" | "tg" => Ok(Platform::Telegram),
            "whatsapp" | "wa" => Ok(Platform::WhatsApp),
            "discord" | "dc" => Ok(Platform::Discord),
            "instagram" | "ig" => Ok(Platform::Instagram),
            "line" => Ok(Platform::Line),
            "unknown" => Ok(Platform::Unknown),
            _ => Err(format!(
                "Unknown platform: '{}'. Expected one of: {}",
                s,
                Platform::all_names().join(", ")
            )),
        }
    }
}

/// A parser plugin for one export format.
///
/// Implementations must be cheap to share: the registry hands out
/// `&dyn FormatParser` and a single plugin instance may run several parses
/// at once. All per-parse state lives in the returned [`EventStream`].
///
/// # Implementation Notes
///
/// Plugins must implement:
/// - [`feature`](FormatParser::feature) - the static detection fingerprint
/// - [`parse`](FormatParser::parse) - build the event stream for one file
///
/// Optionally override:
/// - [`preprocessor`](FormatParser::preprocessor) - raw input repair (default: identity)
/// - [`matches`](FormatParser::matches) - custom relevance check (default: feature signatures)
pub trait FormatParser: Send + Sync {
    /// Returns the static fingerprint of this format.
    fn feature(&self) -> &FormatFeature;

    /// Returns the preprocessor applied to raw input before decoding.
    fn preprocessor(&self) -> &dyn Preprocessor {
        &IDENTITY
    }

    /// Decides whether a file prefix belongs to this format.
    ///
    /// The default evaluates the feature's signatures; every condition must
    /// hold.
    fn matches(&self, head: &str) -> bool {
        self.feature().matches_head(head)
    }

    /// Starts a parse. Nothing is read until the stream is first polled.
    fn parse(&self, options: ParseOptions) -> EventStream;

    /// Returns the human-readable name of this parser.
    fn name(&self) -> &str {
        self.feature().name()
    }
}

impl std::fmt::Debug for dyn FormatParser + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatParser")
            .field("feature", self.feature())
            .finish()
    }
}
