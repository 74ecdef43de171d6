use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use crate::error::ApiError;
use crate::state::AppState;

/// Rolling-window request limiter keyed by client identifier. Excess
/// requests inside the window are rejected, not queued.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<RwLock<HashMap<String, VecDeque<DateTime<Utc>>>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    pub const DEFAULT_MAX_REQUESTS: usize = 100;
    pub const DEFAULT_WINDOW_MINUTES: i64 = 15;

    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            max_requests,
            window,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(
            Self::DEFAULT_MAX_REQUESTS,
            Duration::minutes(Self::DEFAULT_WINDOW_MINUTES),
        )
    }

    /// Record a request for `key`; false means over the limit.
    pub async fn check(&self, key: &str) -> bool {
        self.check_at(key, Utc::now()).await
    }

    async fn check_at(&self, key: &str, now: DateTime<Utc>) -> bool {
        let mut map = self.inner.write().await;
        let hits = map.entry(key.to_string()).or_default();
        while hits.front().is_some_and(|t| *t + self.window <= now) {
            hits.pop_front();
        }
        if hits.len() >= self.max_requests {
            return false;
        }
        hits.push_back(now);
        true
    }
}

/// Reject excess requests per client address before any handler runs.
pub async fn rate_limit(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let key = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    if !state.limiter.check(&key).await {
        return Err(ApiError::RateLimited);
    }
    Ok(next.run(req).await)
}
