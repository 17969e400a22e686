use crate::Database;
use crate::models::MessageRow;
use anyhow::Result;
use rusqlite::Connection;

/// Retention bound: history queries never return more than this many rows.
/// Enforced at read time via the most-recent-N query rather than by
/// physical deletion on write.
pub const HISTORY_CAP: u32 = 200;

impl Database {
    pub fn append_message(&self, row: &MessageRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, name, text, ts, seq, reply_to_id, reply_to_name, reply_to_text)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    row.id,
                    row.name,
                    row.text,
                    row.ts,
                    row.seq,
                    row.reply_to_id,
                    row.reply_to_name,
                    row.reply_to_text,
                ],
            )?;
            Ok(())
        })
    }

    /// The most recent `limit` messages in chronological order (oldest
    /// first), ties within a millisecond broken by insertion sequence.
    pub fn recent_messages(&self, limit: u32) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| query_recent(conn, limit.min(HISTORY_CAP)))
    }

    /// Idempotent: deleting an absent id is a no-op. Returns whether a row
    /// was actually removed.
    pub fn delete_message(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM messages WHERE id = ?1", [id])?;
            Ok(n > 0)
        })
    }

    pub fn clear_messages(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM messages", [])?;
            Ok(())
        })
    }
}

fn query_recent(conn: &Connection, limit: u32) -> Result<Vec<MessageRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, text, ts, seq, reply_to_id, reply_to_name, reply_to_text
         FROM messages
         ORDER BY ts DESC, seq DESC
         LIMIT ?1",
    )?;

    let mut rows = stmt
        .query_map([limit], |row| {
            Ok(MessageRow {
                id: row.get(0)?,
                name: row.get(1)?,
                text: row.get(2)?,
                ts: row.get(3)?,
                seq: row.get(4)?,
                reply_to_id: row.get(5)?,
                reply_to_name: row.get(6)?,
                reply_to_text: row.get(7)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    // Query walks newest-first for the LIMIT; callers want oldest-first.
    rows.reverse();
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, ts: i64, seq: i64) -> MessageRow {
        MessageRow {
            id: id.to_string(),
            name: "Ada".into(),
            text: format!("message {id}"),
            ts,
            seq,
            reply_to_id: None,
            reply_to_name: None,
            reply_to_text: None,
        }
    }

    #[test]
    fn recent_returns_chronological_order() {
        let db = Database::open_in_memory().unwrap();
        db.append_message(&row("100-1", 100, 1)).unwrap();
        db.append_message(&row("300-3", 300, 3)).unwrap();
        db.append_message(&row("200-2", 200, 2)).unwrap();

        let ids: Vec<String> = db
            .recent_messages(HISTORY_CAP)
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, ["100-1", "200-2", "300-3"]);
    }

    #[test]
    fn identical_millisecond_burst_keeps_arrival_order() {
        let db = Database::open_in_memory().unwrap();
        // Three messages in the same millisecond: only seq disambiguates.
        db.append_message(&row("500-1", 500, 1)).unwrap();
        db.append_message(&row("500-2", 500, 2)).unwrap();
        db.append_message(&row("500-3", 500, 3)).unwrap();

        let ids: Vec<String> = db
            .recent_messages(HISTORY_CAP)
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, ["500-1", "500-2", "500-3"]);
    }

    #[test]
    fn history_is_capped_at_200_most_recent() {
        let db = Database::open_in_memory().unwrap();
        for i in 1..=201_i64 {
            db.append_message(&row(&format!("{i}-{i}"), i, i)).unwrap();
        }

        let rows = db.recent_messages(HISTORY_CAP).unwrap();
        assert_eq!(rows.len(), 200);
        // The single oldest message is the one evicted from view.
        assert_eq!(rows.first().unwrap().id, "2-2");
        assert_eq!(rows.last().unwrap().id, "201-201");
    }

    #[test]
    fn delete_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        db.append_message(&row("100-1", 100, 1)).unwrap();

        assert!(db.delete_message("100-1").unwrap());
        assert!(!db.delete_message("100-1").unwrap());
        assert!(!db.delete_message("never-existed").unwrap());
    }

    #[test]
    fn clear_empties_the_store() {
        let db = Database::open_in_memory().unwrap();
        db.append_message(&row("100-1", 100, 1)).unwrap();
        db.append_message(&row("100-2", 100, 2)).unwrap();

        db.clear_messages().unwrap();
        assert!(db.recent_messages(HISTORY_CAP).unwrap().is_empty());
    }

    #[test]
    fn reply_snapshot_round_trips_through_columns() {
        use parlor_types::models::{ChatMessage, ReplySnapshot};

        let db = Database::open_in_memory().unwrap();
        let msg = ChatMessage {
            id: "900-7".into(),
            name: "Bea".into(),
            text: "replying".into(),
            ts: 900,
            reply_to: Some(ReplySnapshot {
                id: "100-1".into(),
                name: "Ada".into(),
                text: "original".into(),
            }),
        };
        db.append_message(&MessageRow::from_message(&msg, 7)).unwrap();

        let got: ChatMessage = db
            .recent_messages(HISTORY_CAP)
            .unwrap()
            .pop()
            .unwrap()
            .into();
        assert_eq!(got, msg);
    }
}
