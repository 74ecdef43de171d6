use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS accounts (
            id          TEXT PRIMARY KEY,
            username    TEXT NOT NULL UNIQUE,
            email       TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            coins       INTEGER NOT NULL DEFAULT 100 CHECK (coins >= 0),
            is_admin    INTEGER NOT NULL DEFAULT 0,
            admin_level INTEGER NOT NULL DEFAULT 0,
            is_banned   INTEGER NOT NULL DEFAULT 0,
            ban_reason  TEXT,
            ban_expires TEXT,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS promo_codes (
            id          TEXT PRIMARY KEY,
            code        TEXT NOT NULL UNIQUE,
            reward      INTEGER NOT NULL,
            uses        INTEGER NOT NULL DEFAULT 0,
            max_uses    INTEGER NOT NULL DEFAULT -1,
            created_by  TEXT NOT NULL REFERENCES accounts(id),
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS chat_messages (
            id          TEXT PRIMARY KEY,
            username    TEXT NOT NULL,
            message     TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_chat_messages_created
            ON chat_messages(created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
