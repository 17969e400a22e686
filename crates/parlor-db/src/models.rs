use parlor_types::models::{ChatMessage, ReplySnapshot};

/// Database row type — maps directly to a SQLite row.
/// The reply snapshot is denormalized into three nullable columns; either
/// all three are set or none are.
#[derive(Debug, Clone)]
pub struct MessageRow {
    pub id: String,
    pub name: String,
    pub text: String,
    pub ts: i64,
    pub seq: i64,
    pub reply_to_id: Option<String>,
    pub reply_to_name: Option<String>,
    pub reply_to_text: Option<String>,
}

impl MessageRow {
    pub fn from_message(msg: &ChatMessage, seq: i64) -> Self {
        Self {
            id: msg.id.clone(),
            name: msg.name.clone(),
            text: msg.text.clone(),
            ts: msg.ts,
            seq,
            reply_to_id: msg.reply_to.as_ref().map(|r| r.id.clone()),
            reply_to_name: msg.reply_to.as_ref().map(|r| r.name.clone()),
            reply_to_text: msg.reply_to.as_ref().map(|r| r.text.clone()),
        }
    }
}

impl From<MessageRow> for ChatMessage {
    fn from(row: MessageRow) -> Self {
        let reply_to = match (row.reply_to_id, row.reply_to_name, row.reply_to_text) {
            (Some(id), Some(name), Some(text)) => Some(ReplySnapshot { id, name, text }),
            _ => None,
        };
        ChatMessage {
            id: row.id,
            name: row.name,
            text: row.text,
            ts: row.ts,
            reply_to,
        }
    }
}
