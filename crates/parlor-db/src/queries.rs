use crate::Database;
use crate::models::{AccountRow, ChatMessageRow};
use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::Connection;

/// Fields for a new account record. Coins and admin level are decided by
/// the caller (registration bonus, bootstrap admin).
pub struct NewAccount<'a> {
    pub id: &'a str,
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub coins: i64,
    pub admin_level: i64,
}

impl Database {
    // -- Accounts --

    pub fn create_account(&self, new: &NewAccount<'_>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO accounts (id, username, email, password, coins, is_admin, admin_level)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    new.id,
                    new.username,
                    new.email,
                    new.password_hash,
                    new.coins,
                    new.admin_level > 0,
                    new.admin_level,
                ],
            )?;
            Ok(())
        })
    }

    pub fn account_count(&self) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM accounts", [], |row| row.get(0))?)
        })
    }

    pub fn get_account_by_id(&self, id: &str) -> Result<Option<AccountRow>> {
        self.with_conn(|conn| query_account(conn, "id = ?1", id))
    }

    /// Look up by username or email; both identify an account at login.
    pub fn get_account_by_identifier(&self, identifier: &str) -> Result<Option<AccountRow>> {
        self.with_conn(|conn| query_account(conn, "username = ?1 OR email = ?1", identifier))
    }

    pub fn list_accounts(&self) -> Result<Vec<AccountRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, username, email, password, coins, is_admin, admin_level,
                        is_banned, ban_reason, ban_expires, created_at
                 FROM accounts
                 ORDER BY created_at DESC, username",
            )?;
            let rows = stmt
                .query_map([], account_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Bans --

    /// Apply a ban. Returns false when no such account exists.
    pub fn set_ban(
        &self,
        id: &str,
        reason: &str,
        expires: Option<DateTime<Utc>>,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE accounts SET is_banned = 1, ban_reason = ?2, ban_expires = ?3
                 WHERE id = ?1",
                rusqlite::params![id, reason, expires],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn clear_ban(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE accounts SET is_banned = 0, ban_reason = NULL, ban_expires = NULL
                 WHERE id = ?1",
                [id],
            )?;
            Ok(changed > 0)
        })
    }

    /// Set the privilege tier. `is_admin` tracks `admin_level > 0`.
    pub fn set_admin_level(&self, id: &str, level: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE accounts SET is_admin = ?2, admin_level = ?3 WHERE id = ?1",
                rusqlite::params![id, level > 0, level],
            )?;
            Ok(changed > 0)
        })
    }

    // -- Chat messages --

    pub fn insert_chat_message(
        &self,
        id: &str,
        username: &str,
        message: &str,
        created_at: DateTime<Utc>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO chat_messages (id, username, message, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, username, message, created_at],
            )?;
            Ok(())
        })
    }

    /// Newest `limit` messages, newest first.
    pub fn recent_chat_messages(&self, limit: u32) -> Result<Vec<ChatMessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, username, message, created_at
                 FROM chat_messages
                 ORDER BY created_at DESC
                 LIMIT ?1",
            )?;
            let rows = stmt
                .query_map([limit], |row| {
                    Ok(ChatMessageRow {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        message: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_account(conn: &Connection, filter: &str, param: &str) -> Result<Option<AccountRow>> {
    let sql = format!(
        "SELECT id, username, email, password, coins, is_admin, admin_level,
                is_banned, ban_reason, ban_expires, created_at
         FROM accounts WHERE {filter}"
    );
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row([param], account_from_row).optional()?;
    Ok(row)
}

fn account_from_row(row: &rusqlite::Row<'_>) -> std::result::Result<AccountRow, rusqlite::Error> {
    Ok(AccountRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        coins: row.get(4)?,
        is_admin: row.get(5)?,
        admin_level: row.get(6)?,
        is_banned: row.get(7)?,
        ban_reason: row.get(8)?,
        ban_expires: row.get(9)?,
        created_at: row.get(10)?,
    })
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
