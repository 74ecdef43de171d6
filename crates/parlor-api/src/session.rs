use std::collections::HashMap;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Cookie carrying the session token.
pub const SESSION_COOKIE: &str = "parlor_session";

/// Absolute session lifetime from creation. No renewal; a new login is
/// required once expired.
const SESSION_TTL_HOURS: i64 = 24;

/// Maps opaque tokens to authenticated account ids. The token embeds no
/// information; all state lives server-side in this map. A session only
/// references an account id; callers must re-check live account state,
/// never trust anything cached here.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<RwLock<HashMap<String, SessionEntry>>>,
}

struct SessionEntry {
    account_id: Uuid,
    created_at: DateTime<Utc>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Issue a fresh token for an authenticated account.
    pub async fn create(&self, account_id: Uuid) -> String {
        let token = generate_token();
        self.inner.write().await.insert(
            token.clone(),
            SessionEntry {
                account_id,
                created_at: Utc::now(),
            },
        );
        token
    }

    pub async fn resolve(&self, token: &str) -> Option<Uuid> {
        self.resolve_at(token, Utc::now()).await
    }

    /// An expired token resolves to none and is purged here, lazily.
    async fn resolve_at(&self, token: &str, now: DateTime<Utc>) -> Option<Uuid> {
        let mut sessions = self.inner.write().await;
        match sessions.get(token) {
            Some(entry) if now < entry.created_at + Duration::hours(SESSION_TTL_HOURS) => {
                Some(entry.account_id)
            }
            Some(_) => {
                sessions.remove(token);
                None
            }
            None => None,
        }
    }

    pub async fn destroy(&self, token: &str) {
        self.inner.write().await.remove(token);
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_resolve_destroy() {
        let sessions = SessionManager::new();
        let account_id = Uuid::new_v4();

        let token = sessions.create(account_id).await;
        assert_eq!(sessions.resolve(&token).await, Some(account_id));

        sessions.destroy(&token).await;
        assert_eq!(sessions.resolve(&token).await, None);
    }

    #[tokio::test]
    async fn unknown_token_resolves_to_none() {
        let sessions = SessionManager::new();
        assert_eq!(sessions.resolve("not-a-token").await, None);
    }

    #[tokio::test]
    async fn expired_token_is_purged() {
        let sessions = SessionManager::new();
        let token = sessions.create(Uuid::new_v4()).await;

        let later = Utc::now() + Duration::hours(SESSION_TTL_HOURS) + Duration::seconds(1);
        assert_eq!(sessions.resolve_at(&token, later).await, None);

        // Lazily purged: gone even for a now-valid clock.
        assert_eq!(sessions.resolve(&token).await, None);
    }

    #[tokio::test]
    async fn tokens_are_unique_per_session() {
        let sessions = SessionManager::new();
        let account_id = Uuid::new_v4();
        let a = sessions.create(account_id).await;
        let b = sessions.create(account_id).await;
        assert_ne!(a, b);
    }
}
