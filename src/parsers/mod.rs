//! Built-in format plugins.
//!
//! Each plugin implements [`FormatParser`](crate::parser::FormatParser) and is
//! registered by [`default_registry`](crate::registry::default_registry).
//!
//! # Available Parsers
//!
//! - [`WechatJsonParser`] - WeChat JSON exports (`wechat-json`)

#[cfg(feature = "wechat")]
mod wechat;

#[cfg(feature = "wechat")]
pub use wechat::{WECHAT_JSON_ID, WechatJsonParser};

use crate::error::Result;
use crate::parser::FormatParser;

/// Instantiates every plugin compiled into this build, in registration order.
///
/// # Errors
///
/// Returns an error if a plugin's signatures fail to compile.
pub fn builtin_parsers() -> Result<Vec<Box<dyn FormatParser>>> {
    #[allow(unused_mut)]
    let mut parsers: Vec<Box<dyn FormatParser>> = Vec::new();

    #[cfg(feature = "wechat")]
    parsers.push(Box::new(WechatJsonParser::new()?));

    Ok(parsers)
}
