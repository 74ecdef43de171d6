use std::sync::Arc;

use parlor_db::Database;

use crate::error::ApiError;
use crate::rate_limit::RateLimiter;
use crate::session::SessionManager;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub sessions: SessionManager,
    pub limiter: RateLimiter,
    /// Username granted bootstrap admin rights at registration, alongside
    /// the very first account.
    pub bootstrap_admin: Option<String>,
}

impl AppState {
    pub fn new(db: Arc<Database>, bootstrap_admin: Option<String>) -> Self {
        Self {
            db,
            sessions: SessionManager::new(),
            limiter: RateLimiter::with_defaults(),
            bootstrap_admin,
        }
    }
}

/// Run blocking DB work off the async runtime.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result.map_err(ApiError::Internal),
        Err(e) => Err(ApiError::Internal(anyhow::anyhow!(
            "spawn_blocking join error: {e}"
        ))),
    }
}
