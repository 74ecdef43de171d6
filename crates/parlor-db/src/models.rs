use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parlor_types::models::{Account, ChatMessage, PromoCode};

/// Raw account row. The only type that carries the password digest.
#[derive(Debug, Clone)]
pub struct AccountRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub coins: i64,
    pub is_admin: bool,
    pub admin_level: i64,
    pub is_banned: bool,
    pub ban_reason: Option<String>,
    pub ban_expires: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl AccountRow {
    /// Convert to the digest-free domain type.
    pub fn into_account(self) -> Result<Account> {
        Ok(Account {
            id: self.id.parse().with_context(|| format!("corrupt account id '{}'", self.id))?,
            username: self.username,
            email: self.email,
            coins: self.coins,
            is_admin: self.is_admin,
            admin_level: self.admin_level,
            is_banned: self.is_banned,
            ban_reason: self.ban_reason,
            ban_expires: self.ban_expires,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct PromoRow {
    pub id: String,
    pub code: String,
    pub reward: i64,
    pub uses: i64,
    pub max_uses: i64,
    pub created_by: String,
    pub creator_username: String,
    pub created_at: DateTime<Utc>,
}

impl PromoRow {
    pub fn into_promo(self) -> Result<PromoCode> {
        Ok(PromoCode {
            id: self.id.parse().with_context(|| format!("corrupt promo id '{}'", self.id))?,
            code: self.code,
            reward: self.reward,
            uses: self.uses,
            max_uses: self.max_uses,
            created_by: self
                .created_by
                .parse()
                .with_context(|| format!("corrupt promo creator id '{}'", self.created_by))?,
            creator_username: self.creator_username,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ChatMessageRow {
    pub id: String,
    pub username: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessageRow {
    pub fn into_message(self) -> Result<ChatMessage> {
        Ok(ChatMessage {
            id: self.id.parse().with_context(|| format!("corrupt message id '{}'", self.id))?,
            username: self.username,
            message: self.message,
            timestamp: self.created_at,
        })
    }
}
