use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS messages (
            id              TEXT PRIMARY KEY,
            name            TEXT NOT NULL,
            text            TEXT NOT NULL,
            ts              INTEGER NOT NULL,
            seq             INTEGER NOT NULL,
            reply_to_id     TEXT,
            reply_to_name   TEXT,
            reply_to_text   TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_messages_ts_seq
            ON messages(ts, seq);
        ",
    )?;

    info!("Message store migrations complete");
    Ok(())
}
