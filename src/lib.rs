//! # chatimport
//!
//! Detects which third-party tool wrote a chat export and stream-decodes it
//! into normalized messages and members, without loading the file into
//! memory.
//!
//! ## Overview
//!
//! - A [`FormatRegistry`](registry::FormatRegistry) holds format plugins and
//!   picks one for a file by matching feature signatures against the first
//!   few kilobytes.
//! - A plugin ([`FormatParser`](parser::FormatParser)) turns the file into a
//!   lazily produced sequence of [`ParseEvent`](event::ParseEvent)s:
//!   `progress, meta, progress*, members, messages*, progress(done), done`,
//!   or a terminal `error`.
//! - An optional [`Preprocessor`](preprocess::Preprocessor) repairs raw input
//!   from known-broken exporters before decoding.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chatimport::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let registry = default_registry()?;
//!     let parser = registry.require("wechat_export.json")?;
//!
//!     for event in parser.parse(ParseOptions::new("wechat_export.json")) {
//!         match event {
//!             ParseEvent::Meta(meta) => println!("{} ({})", meta.name, meta.chat_type),
//!             ParseEvent::Messages { messages } => println!("{} messages", messages.len()),
//!             ParseEvent::Error { reason } => eprintln!("failed: {reason}"),
//!             _ => {}
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Structure
//!
//! - [`registry`] - format detection and plugin lookup
//! - [`feature`] - static format fingerprints
//! - [`parser`] - the plugin trait and [`Platform`](parser::Platform)
//! - [`parsers`] - built-in plugins
//! - [`parsing`] - format-specific record decoding
//! - [`streaming`] - the shared streaming pipeline
//! - [`preprocess`] - raw input repair hooks
//! - [`event`], [`message`], [`progress`] - the event contract
//! - [`config`] - per-parse options and streaming limits
//! - [`error`] - [`ImportError`] and [`Result`]

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod event;
pub mod feature;
pub mod message;
pub mod parser;
pub mod parsers;
pub mod parsing;
pub mod preprocess;
pub mod progress;
pub mod registry;
pub mod streaming;

pub use error::{ImportError, Result};

/// Convenient re-exports for common usage.
///
/// ```rust
/// use chatimport::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{ParseOptions, StreamingConfig};
    pub use crate::error::{ImportError, Result};
    pub use crate::event::ParseEvent;
    pub use crate::feature::FormatFeature;
    pub use crate::message::{ChatType, MessageType, ParsedMember, ParsedMessage, ParsedMeta};
    pub use crate::parser::{FormatParser, Platform};
    pub use crate::progress::{Progress, ProgressCallback, Stage};
    pub use crate::registry::{FormatRegistry, default_registry};
    pub use crate::streaming::{EventReceiver, EventStream};

    #[cfg(feature = "wechat")]
    pub use crate::parsers::WechatJsonParser;
}
