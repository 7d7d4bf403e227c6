//! WeChat JSON export decoding.
//!
//! Layout written by the common desktop exporters:
//!
//! ```json
//! {
//!   "session": {"wxid": "123@chatroom", "nickname": "Team", "remark": "",
//!               "displayName": "Team", "type": "群聊", "messageCount": 2},
//!   "messages": [
//!     {"localId": 1, "createTime": 1705314600, "type": "文本消息",
//!      "content": "hi", "senderUsername": "wxid_a",
//!      "senderDisplayName": "Alice", "groupNickname": "Al"}
//!   ]
//! }
//! ```

use std::path::Path;

use chrono::DateTime;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::error::Result;
use crate::message::{ChatType, MessageType, ParsedMessage, ParsedMeta};
use crate::parser::Platform;
use crate::streaming::{RecordDecoder, container_len};

/// Top-level key of the message array.
pub const RECORDS_KEY: &str = "messages";

/// Identifier suffix WeChat uses for group conversations.
pub const CHATROOM_SUFFIX: &str = "@chatroom";

/// Start of the `session` object in the file prefix.
const SESSION_PATTERN: &str = r#""session"\s*:\s*\{"#;

/// Name used when neither the header nor the path yields one.
const FALLBACK_NAME: &str = "WeChat Chat";

/// Values above this are millisecond timestamps.
const MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

/// Raw message record as written by the exporter.
///
/// Fields the pipeline does not need are ignored. A record whose fields have
/// the wrong JSON types fails to deserialize and is dropped.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WechatRawMessage {
    /// Exporter-local id, numeric or string
    #[serde(default)]
    pub local_id: Option<Value>,
    /// Seconds or milliseconds since the epoch, or an RFC 3339 string
    #[serde(default)]
    pub create_time: Option<Value>,
    /// Label such as `"文本消息"`, or a numeric code
    #[serde(rename = "type", default)]
    pub msg_type: Option<Value>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub sender_username: Option<String>,
    #[serde(default)]
    pub sender_display_name: Option<String>,
    #[serde(default)]
    pub group_nickname: Option<String>,
}

/// Conversation header fields.
///
/// Extracted field by field so that one oddly-typed value does not discard
/// the rest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionHeader {
    pub wxid: Option<String>,
    pub nickname: Option<String>,
    pub remark: Option<String>,
    pub display_name: Option<String>,
    pub chat_type: Option<String>,
    pub message_count: Option<u64>,
}

impl SessionHeader {
    fn from_value(value: &Value) -> Self {
        let text = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToString::to_string)
        };
        Self {
            wxid: text("wxid").or_else(|| text("username")),
            nickname: text("nickname"),
            remark: text("remark"),
            display_name: text("displayName"),
            chat_type: text("type"),
            message_count: value.get("messageCount").and_then(Value::as_u64),
        }
    }

    /// Derives the conversation type.
    ///
    /// An explicit private marker is not trusted for chatroom ids: some
    /// exporter versions label every conversation `私聊`.
    pub fn chat_type(&self) -> ChatType {
        let is_chatroom = self
            .wxid
            .as_deref()
            .is_some_and(|id| id.ends_with(CHATROOM_SUFFIX));

        match self.chat_type.as_deref().map(str::to_lowercase).as_deref() {
            Some("群聊" | "group") => ChatType::Group,
            Some("私聊" | "private") if is_chatroom => ChatType::Group,
            Some("私聊" | "private") => ChatType::Private,
            _ => match &self.wxid {
                Some(_) if is_chatroom => ChatType::Group,
                Some(_) => ChatType::Private,
                None => ChatType::Group,
            },
        }
    }

    /// Best display name: remark, then display name, then nickname.
    pub fn name(&self) -> Option<&str> {
        self.remark
            .as_deref()
            .or(self.display_name.as_deref())
            .or(self.nickname.as_deref())
    }
}

/// Compiles the header extraction pattern.
pub fn session_regex() -> Result<Regex> {
    Ok(Regex::new(SESSION_PATTERN)?)
}

/// Extracts the `session` object from a file prefix.
///
/// Best effort: returns `None` if the object is absent, cut off by the
/// prefix window or not valid JSON.
pub fn extract_session(re: &Regex, head: &str) -> Option<SessionHeader> {
    let start = re.find(head)?.end() - 1;
    let object = &head.as_bytes()[start..];
    let fragment = &object[..container_len(object)?];
    let value: Value = serde_json::from_slice(fragment).ok()?;
    value.is_object().then(|| SessionHeader::from_value(&value))
}

/// Parses a record timestamp into seconds since the epoch.
///
/// Accepts integers, numeric strings and RFC 3339 strings. Values above
/// 10^12 are read as milliseconds.
///
/// # Example
///
/// ```rust
/// use chatimport::parsing::wechat::parse_timestamp;
/// use serde_json::json;
///
/// assert_eq!(parse_timestamp(&json!(1705314600)), Some(1705314600));
/// assert_eq!(parse_timestamp(&json!(1705314600123_i64)), Some(1705314600));
/// assert_eq!(parse_timestamp(&json!("2024-01-15T10:30:00Z")), Some(1705314600));
/// assert_eq!(parse_timestamp(&json!(null)), None);
/// ```
pub fn parse_timestamp(value: &Value) -> Option<i64> {
    let raw = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))?,
        Value::String(s) => {
            let s = s.trim();
            match s.parse::<i64>() {
                Ok(n) => n,
                Err(_) => return DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.timestamp()),
            }
        }
        _ => return None,
    };

    if raw > MILLIS_THRESHOLD {
        Some(raw / 1000)
    } else {
        Some(raw)
    }
}

/// Maps an exporter type label to the canonical message type.
///
/// Covers the Chinese labels written by the exporters and plain English
/// aliases. Unknown labels map to [`MessageType::Other`].
///
/// # Example
///
/// ```rust
/// use chatimport::message::MessageType;
/// use chatimport::parsing::wechat::convert_message_type;
///
/// assert_eq!(convert_message_type("文本消息"), MessageType::Text);
/// assert_eq!(convert_message_type("Image"), MessageType::Image);
/// assert_eq!(convert_message_type("???"), MessageType::Other);
/// ```
pub fn convert_message_type(label: &str) -> MessageType {
    match label.trim().to_lowercase().as_str() {
        "文本消息" | "文本" | "text" => MessageType::Text,
        "图片消息" | "图片" | "image" | "picture" => MessageType::Image,
        "语音消息" | "语音" | "voice" | "audio" => MessageType::Voice,
        "视频消息" | "视频" | "video" => MessageType::Video,
        "文件消息" | "文件" | "file" => MessageType::File,
        "动画表情" | "表情消息" | "表情" | "emoji" | "sticker" => MessageType::Emoji,
        "名片消息" | "名片" | "contact" | "card" => MessageType::Contact,
        "链接消息" | "链接" | "link" | "url" => MessageType::Link,
        "位置消息" | "位置" | "location" => MessageType::Location,
        "红包消息" | "红包" | "red_packet" | "redpacket" => MessageType::RedPacket,
        "转账消息" | "转账" | "transfer" => MessageType::Transfer,
        "分享消息" | "小程序消息" | "音乐消息" | "视频号消息" | "share" => {
            MessageType::Share
        }
        "引用消息" | "回复消息" | "reply" | "quote" => MessageType::Reply,
        "合并转发消息" | "聊天记录" | "forward" => MessageType::Forward,
        "系统消息" | "撤回消息" | "拍一拍" | "system" => MessageType::System,
        _ => MessageType::Other,
    }
}

/// Maps a numeric WeChat message code to the canonical message type.
pub fn convert_message_code(code: i64) -> MessageType {
    match code {
        1 => MessageType::Text,
        3 => MessageType::Image,
        34 => MessageType::Voice,
        42 => MessageType::Contact,
        43 => MessageType::Video,
        47 => MessageType::Emoji,
        48 => MessageType::Location,
        49 => MessageType::Link,
        10000 | 10002 => MessageType::System,
        _ => MessageType::Other,
    }
}

fn message_type(value: Option<&Value>) -> MessageType {
    match value {
        Some(Value::String(label)) => convert_message_type(label),
        Some(Value::Number(n)) => n.as_i64().map_or(MessageType::Other, convert_message_code),
        _ => MessageType::Other,
    }
}

/// Normalizes a raw record.
///
/// Returns `None` if the sender id is missing or empty or the timestamp is
/// undefined.
pub fn parse_wechat_message(msg: WechatRawMessage) -> Option<ParsedMessage> {
    let sender_id = msg
        .sender_username
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())?;
    let timestamp = msg.create_time.as_ref().and_then(parse_timestamp)?;

    let display_name = msg.sender_display_name.filter(|s| !s.trim().is_empty());
    let sender_name_inferred = display_name.is_none();
    let account_name = display_name.unwrap_or_else(|| sender_id.clone());

    let mut message = ParsedMessage::new(
        sender_id,
        account_name,
        timestamp,
        message_type(msg.msg_type.as_ref()),
    );
    message.sender_name_inferred = sender_name_inferred;
    message.content = msg.content;
    message.sender_group_nickname = msg.group_nickname.filter(|s| !s.trim().is_empty());
    message.platform_message_id = match msg.local_id {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };
    Some(message)
}

/// [`RecordDecoder`] for WeChat JSON exports.
#[derive(Debug, Clone)]
pub struct WechatDecoder {
    session_re: Regex,
}

impl WechatDecoder {
    pub fn new(session_re: Regex) -> Self {
        Self { session_re }
    }
}

impl RecordDecoder for WechatDecoder {
    fn format_name(&self) -> &'static str {
        "WeChat JSON"
    }

    fn records_key(&self) -> &str {
        RECORDS_KEY
    }

    fn decode_meta(&self, head: &str, path: &Path) -> ParsedMeta {
        let header = extract_session(&self.session_re, head).unwrap_or_else(|| {
            tracing::debug!(path = %path.display(), "no usable session header, using defaults");
            SessionHeader::default()
        });

        let name = header
            .name()
            .map(ToString::to_string)
            .or_else(|| {
                path.file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .filter(|stem| !stem.is_empty())
            })
            .unwrap_or_else(|| FALLBACK_NAME.to_string());

        ParsedMeta::new(name, Platform::WeChat, header.chat_type())
    }

    fn normalize(&self, record: Value) -> Option<ParsedMessage> {
        let raw: WechatRawMessage = serde_json::from_value(record).ok()?;
        parse_wechat_message(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn header(head: &str) -> Option<SessionHeader> {
        extract_session(&session_regex().unwrap(), head)
    }

    fn decoder() -> WechatDecoder {
        WechatDecoder::new(session_regex().unwrap())
    }

    #[test]
    fn test_extract_session() {
        let head = r#"{"session": {"wxid": "123@chatroom", "nickname": "Team", "type": "群聊", "messageCount": 2}, "messages": ["#;
        let session = header(head).unwrap();
        assert_eq!(session.wxid.as_deref(), Some("123@chatroom"));
        assert_eq!(session.chat_type.as_deref(), Some("群聊"));
        assert_eq!(session.message_count, Some(2));
        assert_eq!(session.name(), Some("Team"));
    }

    #[test]
    fn test_extract_session_tolerates_odd_types() {
        let session = header(r#"{"session": {"wxid": 42, "remark": "Mom"}}"#).unwrap();
        assert_eq!(session.wxid, None);
        assert_eq!(session.name(), Some("Mom"));
    }

    #[test]
    fn test_extract_session_braces_in_values() {
        let head = r#"{"session": {"wxid": "1@chatroom", "nickname": "Team {A}", "extra": {"k": "}"}}, "messages": ["#;
        let session = header(head).unwrap();
        assert_eq!(session.wxid.as_deref(), Some("1@chatroom"));
        assert_eq!(session.name(), Some("Team {A}"));
    }

    #[test]
    fn test_extract_session_failures() {
        assert!(header(r#"{"messages": []}"#).is_none());
        assert!(header(r#"{"session": {"wxid": "abc", "#).is_none());
        assert!(header(r#"{"session": {not json}}"#).is_none());
    }

    #[test]
    fn test_name_precedence() {
        let mut session = SessionHeader {
            nickname: Some("nick".into()),
            display_name: Some("display".into()),
            remark: Some("remark".into()),
            ..Default::default()
        };
        assert_eq!(session.name(), Some("remark"));
        session.remark = None;
        assert_eq!(session.name(), Some("display"));
        session.display_name = None;
        assert_eq!(session.name(), Some("nick"));
    }

    #[test]
    fn test_chat_type_explicit() {
        let session = |t: &str, id: &str| SessionHeader {
            chat_type: Some(t.into()),
            wxid: Some(id.into()),
            ..Default::default()
        };
        assert_eq!(session("群聊", "wxid_a").chat_type(), ChatType::Group);
        assert_eq!(session("私聊", "wxid_a").chat_type(), ChatType::Private);
        assert_eq!(session("Private", "wxid_a").chat_type(), ChatType::Private);
        // The chatroom suffix overrides a declared private type
        assert_eq!(session("私聊", "1@chatroom").chat_type(), ChatType::Group);
    }

    #[test]
    fn test_chat_type_heuristic() {
        let session = |id: Option<&str>| SessionHeader {
            wxid: id.map(Into::into),
            ..Default::default()
        };
        assert_eq!(session(Some("1@chatroom")).chat_type(), ChatType::Group);
        assert_eq!(session(Some("wxid_a")).chat_type(), ChatType::Private);
        assert_eq!(session(None).chat_type(), ChatType::Group);
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp(&json!(0)), Some(0));
        assert_eq!(parse_timestamp(&json!("1705314600")), Some(1_705_314_600));
        assert_eq!(parse_timestamp(&json!("1705314600123")), Some(1_705_314_600));
        assert_eq!(
            parse_timestamp(&json!("2024-01-15T18:30:00+08:00")),
            Some(1_705_314_600)
        );
        assert_eq!(parse_timestamp(&json!("yesterday")), None);
        assert_eq!(parse_timestamp(&json!(true)), None);
        assert_eq!(parse_timestamp(&json!({})), None);
    }

    #[test]
    fn test_convert_message_type() {
        assert_eq!(convert_message_type("图片消息"), MessageType::Image);
        assert_eq!(convert_message_type("语音消息"), MessageType::Voice);
        assert_eq!(convert_message_type("红包消息"), MessageType::RedPacket);
        assert_eq!(convert_message_type("合并转发消息"), MessageType::Forward);
        assert_eq!(convert_message_type(" TEXT "), MessageType::Text);
        assert_eq!(convert_message_type(""), MessageType::Other);
        assert_eq!(convert_message_type("未知"), MessageType::Other);
    }

    #[test]
    fn test_convert_message_code() {
        assert_eq!(convert_message_code(1), MessageType::Text);
        assert_eq!(convert_message_code(10000), MessageType::System);
        assert_eq!(convert_message_code(-7), MessageType::Other);
    }

    #[test]
    fn test_normalize_valid_record() {
        let msg = decoder()
            .normalize(json!({
                "localId": 7,
                "createTime": 1705314600,
                "type": "文本消息",
                "content": "hello",
                "senderUsername": "wxid_a",
                "senderDisplayName": "Alice",
                "groupNickname": "Al"
            }))
            .unwrap();
        assert_eq!(msg.sender_platform_id, "wxid_a");
        assert_eq!(msg.sender_account_name, "Alice");
        assert_eq!(msg.sender_group_nickname.as_deref(), Some("Al"));
        assert_eq!(msg.timestamp, 1_705_314_600);
        assert_eq!(msg.msg_type, MessageType::Text);
        assert_eq!(msg.content.as_deref(), Some("hello"));
        assert_eq!(msg.platform_message_id.as_deref(), Some("7"));
        assert!(!msg.sender_name_inferred);
    }

    #[test]
    fn test_normalize_display_name_fallback() {
        let msg = decoder()
            .normalize(json!({"createTime": 1, "senderUsername": "wxid_a", "senderDisplayName": ""}))
            .unwrap();
        assert_eq!(msg.sender_account_name, "wxid_a");
        assert!(msg.sender_name_inferred);
        assert_eq!(msg.msg_type, MessageType::Other);
        assert!(msg.content.is_none());
    }

    #[test]
    fn test_normalize_drops_invalid_records() {
        let d = decoder();
        assert!(d.normalize(json!({"createTime": 1})).is_none());
        assert!(d.normalize(json!({"createTime": 1, "senderUsername": "  "})).is_none());
        assert!(d.normalize(json!({"senderUsername": "wxid_a"})).is_none());
        assert!(d.normalize(json!({"createTime": "soon", "senderUsername": "wxid_a"})).is_none());
        // Shape mismatch
        assert!(d.normalize(json!({"createTime": 1, "senderUsername": 5})).is_none());
        assert!(d.normalize(json!([1, 2])).is_none());
        assert!(d.normalize(json!("text")).is_none());
    }

    #[test]
    fn test_decode_meta_fallback_to_file_stem() {
        let meta = decoder().decode_meta("garbage", Path::new("/tmp/family_chat.json"));
        assert_eq!(meta.name, "family_chat");
        assert_eq!(meta.chat_type, ChatType::Group);
        assert_eq!(meta.platform, Platform::WeChat);
    }

    #[test]
    fn test_decode_meta_from_header() {
        let head = r#"{"session": {"wxid": "wxid_b", "displayName": "Bob", "type": "私聊"}, "messages": []}"#;
        let meta = decoder().decode_meta(head, Path::new("x.json"));
        assert_eq!(meta.name, "Bob");
        assert_eq!(meta.chat_type, ChatType::Private);

        let head = r#"{"session": {"wxid": "1@chatroom", "nickname": "Team {A}"}, "messages": []}"#;
        let meta = decoder().decode_meta(head, Path::new("room.json"));
        assert_eq!(meta.name, "Team {A}");
        assert_eq!(meta.chat_type, ChatType::Group);
    }
}
