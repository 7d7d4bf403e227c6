//! WeChat JSON export plugin.

use std::io::Read;

use regex::Regex;

use crate::config::{ParseOptions, StreamingConfig};
use crate::error::Result;
use crate::feature::FormatFeature;
use crate::parser::{FormatParser, Platform};
use crate::parsing::wechat::{RECORDS_KEY, WechatDecoder, session_regex};
use crate::preprocess::{ExportRepair, Preprocessor};
use crate::streaming::EventStream;

/// Feature id of this plugin.
pub const WECHAT_JSON_ID: &str = "wechat-json";

/// Parser for JSON exports of WeChat conversations.
///
/// Input passes through [`ExportRepair`] first, since several exporter
/// versions write raw newlines into message text.
///
/// # Example
///
/// ```rust,no_run
/// use chatimport::config::ParseOptions;
/// use chatimport::parser::FormatParser;
/// use chatimport::parsers::WechatJsonParser;
///
/// let parser = WechatJsonParser::new()?;
/// let count = parser
///     .parse(ParseOptions::new("wechat_export.json"))
///     .filter(|event| event.kind() == "messages")
///     .count();
/// println!("{count} batches");
/// # Ok::<(), chatimport::ImportError>(())
/// ```
#[derive(Debug, Clone)]
pub struct WechatJsonParser {
    feature: FormatFeature,
    session_re: Regex,
    config: StreamingConfig,
}

impl WechatJsonParser {
    /// Creates the parser with the default [`StreamingConfig`].
    pub fn new() -> Result<Self> {
        Self::with_config(StreamingConfig::default())
    }

    /// Creates the parser with custom buffer and limit settings.
    pub fn with_config(config: StreamingConfig) -> Result<Self> {
        let feature = FormatFeature::builder(WECHAT_JSON_ID, "WeChat JSON", Platform::WeChat)
            .priority(10)
            .extension("json")
            .head_pattern(r#""session"\s*:\s*\{"#)
            .required_field("session")
            .required_field(RECORDS_KEY)
            .build()?;

        Ok(Self {
            feature,
            session_re: session_regex()?,
            config,
        })
    }

    pub fn config(&self) -> &StreamingConfig {
        &self.config
    }

    /// Parses an in-memory or otherwise non-file source.
    ///
    /// `options.file_path` is only used to name the conversation when the
    /// header has no name.
    pub fn parse_reader<R>(&self, reader: R, total_bytes: u64, options: ParseOptions) -> EventStream
    where
        R: Read + Send + 'static,
    {
        EventStream::from_reader(
            reader,
            total_bytes,
            options,
            Box::new(self.decoder()),
            self.preprocessor(),
            self.config,
        )
    }

    fn decoder(&self) -> WechatDecoder {
        WechatDecoder::new(self.session_re.clone())
    }
}

impl FormatParser for WechatJsonParser {
    fn feature(&self) -> &FormatFeature {
        &self.feature
    }

    fn preprocessor(&self) -> &dyn Preprocessor {
        &ExportRepair
    }

    fn parse(&self, options: ParseOptions) -> EventStream {
        EventStream::open(
            options,
            Box::new(self.decoder()),
            self.preprocessor(),
            self.config,
        )
    }
}
