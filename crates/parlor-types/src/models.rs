use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered account. The password digest never appears here. It stays
/// inside the db layer's row types, so serializing an `Account` can never
/// leak it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub coins: i64,
    pub is_admin: bool,
    pub admin_level: i64,
    pub is_banned: bool,
    pub ban_reason: Option<String>,
    pub ban_expires: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A redeemable promo code. `max_uses == -1` means unlimited; otherwise
/// `uses` never exceeds `max_uses`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromoCode {
    pub id: Uuid,
    pub code: String,
    pub reward: i64,
    pub uses: i64,
    pub max_uses: i64,
    pub created_by: Uuid,
    pub creator_username: String,
    pub created_at: DateTime<Utc>,
}

/// A persisted chat message. The author's username is denormalized at send
/// time and the text is stored post-filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub username: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}
