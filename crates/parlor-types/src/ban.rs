use chrono::{DateTime, Utc};

use crate::models::Account;

/// Returns true when the account's ban is currently in effect.
///
/// Expiry is evaluated lazily: storage keeps the ban flag set after the
/// expiry passes, and this predicate is what decides whether it still
/// matters. A ban with no expiry is permanent.
pub fn ban_active(account: &Account, now: DateTime<Utc>) -> bool {
    if !account.is_banned {
        return false;
    }
    match account.ban_expires {
        Some(expires) => now < expires,
        None => true,
    }
}
