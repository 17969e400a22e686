use serde::{Deserialize, Serialize};

use crate::models::{ChatMessage, ReplySnapshot, RoomMode};

/// Frames sent FROM client TO server over the WebSocket.
///
/// The `type` tag is a closed taxonomy; anything that fails to parse into
/// one of these variants is a validation error at the connection boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientFrame {
    /// Identify this connection: display name plus caller-asserted privilege.
    #[serde(rename = "hello")]
    Hello {
        #[serde(default)]
        name: String,
        #[serde(default)]
        host: bool,
    },

    /// Submit a candidate message, optionally carrying a reply snapshot.
    #[serde(rename = "msg")]
    Msg {
        #[serde(default)]
        text: String,
        #[serde(rename = "replyTo", default)]
        reply_to: Option<ReplySnapshot>,
    },

    /// Typing indicator on/off.
    #[serde(rename = "typing")]
    Typing {
        #[serde(rename = "isTyping")]
        is_typing: bool,
    },

    /// Host only: adjust slow mode and emoji-only mode.
    #[serde(rename = "setMode")]
    SetMode {
        #[serde(default)]
        slow: i64,
        #[serde(rename = "emojiOnly", default)]
        emoji_only: bool,
    },

    /// Host only: replace the pinned text (empty clears the pin).
    #[serde(rename = "pin")]
    Pin {
        #[serde(default)]
        text: String,
    },

    /// Host only: wipe the message history.
    #[serde(rename = "reset")]
    Reset,

    /// Host only: delete a single message by id.
    #[serde(rename = "delete")]
    Delete { id: String },
}

/// Frames sent FROM server TO clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerFrame {
    /// Room state. The full form (pinned + history + presence count) is
    /// unicast to a session right after `hello`; the mode-only form is
    /// broadcast after a mode change.
    #[serde(rename = "system")]
    System {
        mode: RoomMode,
        #[serde(skip_serializing_if = "Option::is_none")]
        pinned: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        messages: Option<Vec<ChatMessage>>,
        #[serde(rename = "userCount", skip_serializing_if = "Option::is_none")]
        user_count: Option<usize>,
    },

    /// An accepted message, broadcast to every session.
    #[serde(rename = "msg")]
    Msg(ChatMessage),

    /// Pinned text changed.
    #[serde(rename = "pin")]
    Pin { text: String },

    /// History was wiped.
    #[serde(rename = "reset")]
    Reset,

    /// A single message was deleted.
    #[serde(rename = "delete")]
    Delete { id: String },

    /// User-visible rejection, unicast to the offending sender only.
    #[serde(rename = "error")]
    Error { message: String },

    /// Full current typing-name set, broadcast on every typing mutation.
    #[serde(rename = "typing")]
    Typing { users: Vec<String> },

    /// Presence count update.
    #[serde(rename = "userCount")]
    UserCount { count: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_frames_parse_from_wire_json() {
        let frame: ClientFrame =
            serde_json::from_str(r#"{"type":"hello","name":"Ada","host":true}"#).unwrap();
        assert_eq!(
            frame,
            ClientFrame::Hello {
                name: "Ada".into(),
                host: true
            }
        );

        let frame: ClientFrame = serde_json::from_str(
            r#"{"type":"msg","text":"hi","replyTo":{"id":"1-1","name":"Bob","text":"yo"}}"#,
        )
        .unwrap();
        match frame {
            ClientFrame::Msg { text, reply_to } => {
                assert_eq!(text, "hi");
                assert_eq!(reply_to.unwrap().name, "Bob");
            }
            other => panic!("unexpected frame: {other:?}"),
        }

        let frame: ClientFrame = serde_json::from_str(r#"{"type":"reset"}"#).unwrap();
        assert_eq!(frame, ClientFrame::Reset);
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(serde_json::from_str::<ClientFrame>(r#"{"type":"shrug"}"#).is_err());
        assert!(serde_json::from_str::<ClientFrame>(r#"{"text":"no tag"}"#).is_err());
    }

    #[test]
    fn server_msg_frame_flattens_message_fields() {
        let frame = ServerFrame::Msg(ChatMessage {
            id: "1700000000000-1".into(),
            name: "Ada".into(),
            text: "hello".into(),
            ts: 1_700_000_000_000,
            reply_to: None,
        });
        let json: serde_json::Value = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["type"], "msg");
        assert_eq!(json["id"], "1700000000000-1");
        assert_eq!(json["ts"], 1_700_000_000_000_i64);
        // replyTo is omitted entirely when absent
        assert!(json.get("replyTo").is_none());
    }

    #[test]
    fn system_frame_omits_absent_fields() {
        let frame = ServerFrame::System {
            mode: RoomMode {
                slow: 2,
                emoji_only: false,
            },
            pinned: None,
            messages: None,
            user_count: None,
        };
        let json: serde_json::Value = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["mode"]["slow"], 2);
        assert_eq!(json["mode"]["emojiOnly"], false);
        assert!(json.get("pinned").is_none());
        assert!(json.get("messages").is_none());
        assert!(json.get("userCount").is_none());
    }
}
