//! Canonical record types shared by every format plugin.
//!
//! All plugins convert their native records into these structures, so the
//! persistence side never sees a format-specific shape:
//!
//! - [`ParsedMeta`] - one per parse, describes the conversation
//! - [`ParsedMember`] - one per distinct sender
//! - [`ParsedMessage`] - one per accepted record
//!
//! # Example
//!
//! ```
//! use chatimport::message::{MessageType, ParsedMessage};
//!
//! let msg = ParsedMessage::new("wxid_alice", "Alice", 1705314600, MessageType::Text)
//!     .with_content("Hello!");
//!
//! assert_eq!(msg.sender_platform_id, "wxid_alice");
//! assert_eq!(msg.datetime().unwrap().timestamp(), 1705314600);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::parser::Platform;

/// Canonical message kind.
///
/// The set is closed: every format-specific type label maps to exactly one
/// variant, with [`Other`](MessageType::Other) absorbing anything unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    Text,
    Image,
    Voice,
    Video,
    File,
    Emoji,
    Contact,
    Link,
    Location,
    RedPacket,
    Transfer,
    Share,
    Reply,
    Forward,
    System,
    Other,
}

impl MessageType {
    /// Returns all variants in declaration order.
    pub fn all() -> &'static [MessageType] {
        &[
            MessageType::Text,
            MessageType::Image,
            MessageType::Voice,
            MessageType::Video,
            MessageType::File,
            MessageType::Emoji,
            MessageType::Contact,
            MessageType::Link,
            MessageType::Location,
            MessageType::RedPacket,
            MessageType::Transfer,
            MessageType::Share,
            MessageType::Reply,
            MessageType::Forward,
            MessageType::System,
            MessageType::Other,
        ]
    }
}

/// Whether a conversation is a group chat or a one-to-one chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatType {
    /// Multi-party conversation. Also the fallback when nothing is decisive.
    #[default]
    Group,
    /// One-to-one conversation.
    Private,
}

impl std::fmt::Display for ChatType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatType::Group => write!(f, "group"),
            ChatType::Private => write!(f, "private"),
        }
    }
}

/// Conversation-level information, emitted once before any messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedMeta {
    /// Display name of the conversation.
    pub name: String,
    /// Platform the export came from.
    pub platform: Platform,
    /// Group or private conversation.
    #[serde(rename = "type")]
    pub chat_type: ChatType,
}

impl ParsedMeta {
    pub fn new(name: impl Into<String>, platform: Platform, chat_type: ChatType) -> Self {
        Self {
            name: name.into(),
            platform,
            chat_type,
        }
    }
}

/// A distinct sender observed during a parse.
///
/// Identity is `platform_id`. The display fields hold the most recent
/// observation for that id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedMember {
    /// Stable sender identifier, unique within one parse.
    pub platform_id: String,
    /// Best-known display name.
    pub account_name: String,
    /// Most recent in-group nickname, if the format has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub group_nickname: Option<String>,
}

impl ParsedMember {
    pub fn new(platform_id: impl Into<String>, account_name: impl Into<String>) -> Self {
        Self {
            platform_id: platform_id.into(),
            account_name: account_name.into(),
            group_nickname: None,
        }
    }
}

/// A normalized message record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedMessage {
    /// Stable identifier of the sender.
    pub sender_platform_id: String,

    /// Sender display name at the time of this message.
    pub sender_account_name: String,

    /// Sender nickname inside the group, when the format records one.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub sender_group_nickname: Option<String>,

    /// Seconds since the Unix epoch.
    pub timestamp: i64,

    /// Canonical message kind.
    #[serde(rename = "type")]
    pub msg_type: MessageType,

    /// Message body. `None` when the record carries no content.
    pub content: Option<String>,

    /// The exporter's own record id, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub platform_message_id: Option<String>,

    /// Set when the record carried no display name and
    /// `sender_account_name` repeats the sender id. Such a stand-in never
    /// replaces a name observed earlier for the same member.
    #[serde(skip)]
    pub sender_name_inferred: bool,
}

impl ParsedMessage {
    /// Creates a message with no content, nickname or record id.
    pub fn new(
        sender_platform_id: impl Into<String>,
        sender_account_name: impl Into<String>,
        timestamp: i64,
        msg_type: MessageType,
    ) -> Self {
        Self {
            sender_platform_id: sender_platform_id.into(),
            sender_account_name: sender_account_name.into(),
            sender_group_nickname: None,
            timestamp,
            msg_type,
            content: None,
            platform_message_id: None,
            sender_name_inferred: false,
        }
    }

    /// Sets the message body.
    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Sets the in-group nickname.
    #[must_use]
    pub fn with_group_nickname(mut self, nickname: impl Into<String>) -> Self {
        self.sender_group_nickname = Some(nickname.into());
        self
    }

    /// Sets the exporter's record id.
    #[must_use]
    pub fn with_platform_message_id(mut self, id: impl Into<String>) -> Self {
        self.platform_message_id = Some(id.into());
        self
    }

    /// Returns the timestamp as a UTC datetime, or `None` if out of range.
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }
}
