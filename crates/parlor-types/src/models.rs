use serde::{Deserialize, Serialize};

/// A copy of a replied-to message's id/name/text taken at send time.
/// This is a snapshot, not a reference: editing or deleting the original
/// message later never changes it. The server attaches it verbatim as
/// supplied by the client and does not resolve it against history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplySnapshot {
    pub id: String,
    pub name: String,
    pub text: String,
}

/// A chat message as it travels over the wire and sits in history.
///
/// `id` is `"{ts_millis}-{seq}"` where `seq` is a per-process counter, so
/// ids stay unique even when several messages land in the same millisecond.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub name: String,
    pub text: String,
    pub ts: i64,
    #[serde(rename = "replyTo", skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<ReplySnapshot>,
}

/// The broadcastable half of room policy: slow-mode interval in seconds
/// and the emoji-only flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomMode {
    pub slow: u32,
    #[serde(rename = "emojiOnly")]
    pub emoji_only: bool,
}
