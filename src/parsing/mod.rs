//! Format-specific decoding logic.
//!
//! Each submodule holds the raw record types, header extraction and
//! normalization rules for one export format, plus the
//! [`RecordDecoder`](crate::streaming::RecordDecoder) that plugs them into the
//! streaming pipeline.

#[cfg(feature = "wechat")]
pub mod wechat;

#[cfg(feature = "wechat")]
pub use wechat::{
    SessionHeader, WechatDecoder, WechatRawMessage, convert_message_type, parse_timestamp,
    parse_wechat_message,
};
