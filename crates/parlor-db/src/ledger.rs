//! Promo-code ledger: code creation and at-most-`max_uses` redemption.
//!
//! Redemption is the one real concurrency hazard in the system. The
//! check-then-increment must be a single conditional UPDATE inside one
//! transaction so that two redemptions racing for a code's last remaining
//! use can never both succeed.

use crate::Database;
use crate::models::PromoRow;
use crate::queries::OptionalExt;
use anyhow::{Result, anyhow};
use rusqlite::ErrorCode;

/// Result of attempting to insert a new promo code.
#[derive(Debug, PartialEq, Eq)]
pub enum PromoInsert {
    Created,
    Duplicate,
}

/// Result of a redemption attempt. `Credited` carries the reward amount
/// already added to the account's balance.
#[derive(Debug, PartialEq, Eq)]
pub enum RedeemOutcome {
    Credited(i64),
    NotFound,
    Exhausted,
}

/// Canonical form of a promo code: trimmed, upper-case.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

impl Database {
    /// Insert a new promo code. The code is normalized before storage;
    /// reward and max_uses bounds are the caller's responsibility.
    pub fn create_promo(
        &self,
        id: &str,
        code: &str,
        reward: i64,
        max_uses: i64,
        created_by: &str,
    ) -> Result<PromoInsert> {
        let code = normalize_code(code);
        self.with_conn(|conn| {
            let result = conn.execute(
                "INSERT INTO promo_codes (id, code, reward, max_uses, created_by)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, code, reward, max_uses, created_by],
            );
            match result {
                Ok(_) => Ok(PromoInsert::Created),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == ErrorCode::ConstraintViolation =>
                {
                    Ok(PromoInsert::Duplicate)
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    /// Redeem a code for `account_id`, crediting the reward.
    ///
    /// One transaction: the usage counter is incremented by a conditional
    /// UPDATE that only matches while uses remain, then the coins are
    /// credited. If anything fails past the increment the transaction
    /// rolls back, so a use is never burned without its credit.
    pub fn redeem_promo(&self, code: &str, account_id: &str) -> Result<RedeemOutcome> {
        let code = normalize_code(code);
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let claimed = tx.execute(
                "UPDATE promo_codes SET uses = uses + 1
                 WHERE code = ?1 AND (max_uses < 0 OR uses < max_uses)",
                [&code],
            )?;

            if claimed == 0 {
                // Distinguish an unknown code from an exhausted one.
                let exists: bool = tx.query_row(
                    "SELECT EXISTS(SELECT 1 FROM promo_codes WHERE code = ?1)",
                    [&code],
                    |row| row.get(0),
                )?;
                return Ok(if exists {
                    RedeemOutcome::Exhausted
                } else {
                    RedeemOutcome::NotFound
                });
            }

            let reward: i64 = tx.query_row(
                "SELECT reward FROM promo_codes WHERE code = ?1",
                [&code],
                |row| row.get(0),
            )?;

            let credited = tx.execute(
                "UPDATE accounts SET coins = coins + ?1 WHERE id = ?2",
                rusqlite::params![reward, account_id],
            )?;
            if credited == 0 {
                // Dropping the transaction rolls the increment back.
                return Err(anyhow!("redeeming account {} not found", account_id));
            }

            tx.commit()?;
            Ok(RedeemOutcome::Credited(reward))
        })
    }

    pub fn get_promo_by_code(&self, code: &str) -> Result<Option<PromoRow>> {
        let code = normalize_code(code);
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT p.id, p.code, p.reward, p.uses, p.max_uses, p.created_by,
                        a.username, p.created_at
                 FROM promo_codes p
                 JOIN accounts a ON p.created_by = a.id
                 WHERE p.code = ?1",
            )?;
            let row = stmt.query_row([&code], promo_from_row).optional()?;
            Ok(row)
        })
    }

    /// All promo codes with their creator's username, newest first.
    pub fn list_promos(&self) -> Result<Vec<PromoRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT p.id, p.code, p.reward, p.uses, p.max_uses, p.created_by,
                        a.username, p.created_at
                 FROM promo_codes p
                 JOIN accounts a ON p.created_by = a.id
                 ORDER BY p.created_at DESC, p.code",
            )?;
            let rows = stmt
                .query_map([], promo_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn promo_from_row(row: &rusqlite::Row<'_>) -> std::result::Result<PromoRow, rusqlite::Error> {
    Ok(PromoRow {
        id: row.get(0)?,
        code: row.get(1)?,
        reward: row.get(2)?,
        uses: row.get(3)?,
        max_uses: row.get(4)?,
        created_by: row.get(5)?,
        creator_username: row.get(6)?,
        created_at: row.get(7)?,
    })
}
