//! The event contract between a parser plugin and its consumer.
//!
//! A parse produces the ordered sequence
//!
//! ```text
//! progress, meta, progress*, members, messages*, progress(done), done
//! ```
//!
//! or stops early with `progress(error), error`. Exactly one terminal event
//! (`Done` or `Error`) ends every sequence.
//!
//! Events serialize as internally tagged JSON objects, one per line in the
//! CLI's output:
//!
//! ```json
//! {"event":"meta","name":"Team","platform":"wechat","type":"group"}
//! {"event":"done","message_count":12000,"member_count":40}
//! ```

use serde::Serialize;

use crate::message::{ParsedMember, ParsedMessage, ParsedMeta};
use crate::progress::Progress;

/// One unit of parser output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ParseEvent {
    /// Progress tick. Mirrors what the progress callback received.
    Progress(Progress),

    /// Conversation information. Exactly once, before any `Messages`.
    Meta(ParsedMeta),

    /// Every distinct sender. Exactly once, after the input is consumed.
    Members { members: Vec<ParsedMember> },

    /// One batch of messages in source order.
    Messages { messages: Vec<ParsedMessage> },

    /// Successful end of the sequence.
    Done {
        message_count: usize,
        member_count: usize,
    },

    /// Failed end of the sequence. Events already produced stay valid.
    Error { reason: String },
}

impl ParseEvent {
    /// Returns `true` for `Done` and `Error`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ParseEvent::Done { .. } | ParseEvent::Error { .. })
    }

    /// Short lowercase name of the variant, matching the serialized tag.
    pub fn kind(&self) -> &'static str {
        match self {
            ParseEvent::Progress(_) => "progress",
            ParseEvent::Meta(_) => "meta",
            ParseEvent::Members { .. } => "members",
            ParseEvent::Messages { .. } => "messages",
            ParseEvent::Done { .. } => "done",
            ParseEvent::Error { .. } => "error",
        }
    }
}
