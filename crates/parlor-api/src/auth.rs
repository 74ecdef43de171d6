use anyhow::anyhow;
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::http::StatusCode;
use axum::{Json, extract::State, response::IntoResponse};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::Cookie;
use chrono::Utc;
use uuid::Uuid;

use parlor_db::queries::NewAccount;
use parlor_types::api::{AccountSummary, Ack, LoginRequest, RegisterRequest};
use parlor_types::ban::ban_active;

use crate::error::{ApiError, ApiResult};
use crate::session::SESSION_COOKIE;
use crate::state::{AppState, blocking};

/// Registration bonus for a regular account.
const DEFAULT_COINS: i64 = 100;

/// The first account ever registered (or the configured bootstrap admin
/// username) becomes an administrator, the only way the system bootstraps
/// one.
const BOOTSTRAP_ADMIN_COINS: i64 = 10_000;
const BOOTSTRAP_ADMIN_LEVEL: i64 = 10;

pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let username = req.username.trim().to_string();
    let email = req.email.trim().to_lowercase();

    if username.len() < 3 || username.len() > 32 {
        return Err(ApiError::Validation(
            "username must be 3-32 characters".into(),
        ));
    }
    if !email.contains('@') || email.len() > 254 {
        return Err(ApiError::Validation("invalid email address".into()));
    }
    if req.password.len() < 8 {
        return Err(ApiError::Validation(
            "password must be at least 8 characters".into(),
        ));
    }

    let db = state.db.clone();
    let (u, e) = (username.clone(), email.clone());
    let taken = blocking(move || {
        Ok(db.get_account_by_identifier(&u)?.is_some()
            || db.get_account_by_identifier(&e)?.is_some())
    })
    .await?;
    if taken {
        return Err(ApiError::DuplicateAccount);
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(anyhow!("password hashing failed: {e}")))?
        .to_string();

    let db = state.db.clone();
    let count = blocking(move || db.account_count()).await?;
    let is_bootstrap = count == 0 || state.bootstrap_admin.as_deref() == Some(username.as_str());
    let (coins, admin_level) = if is_bootstrap {
        (BOOTSTRAP_ADMIN_COINS, BOOTSTRAP_ADMIN_LEVEL)
    } else {
        (DEFAULT_COINS, 0)
    };

    let account_id = Uuid::new_v4();
    let db = state.db.clone();
    let (u, e) = (username.clone(), email);
    blocking(move || {
        db.create_account(&NewAccount {
            id: &account_id.to_string(),
            username: &u,
            email: &e,
            password_hash: &password_hash,
            coins,
            admin_level,
        })
    })
    .await?;

    let token = state.sessions.create(account_id).await;
    Ok((
        StatusCode::CREATED,
        jar.add(session_cookie(token)),
        Json(AccountSummary {
            id: account_id,
            username,
            is_admin: admin_level > 0,
            coins,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let identifier = req.username.trim().to_string();

    let db = state.db.clone();
    let row = blocking(move || db.get_account_by_identifier(&identifier))
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    // Verify password
    let parsed_hash = PasswordHash::new(&row.password)
        .map_err(|e| ApiError::Internal(anyhow!("corrupt password digest: {e}")))?;
    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::InvalidCredentials)?;

    let account = row.into_account().map_err(ApiError::Internal)?;
    if ban_active(&account, Utc::now()) {
        return Err(ApiError::AccountBanned {
            reason: account.ban_reason,
            expires: account.ban_expires,
        });
    }

    let token = state.sessions.create(account.id).await;
    Ok((
        jar.add(session_cookie(token)),
        Json(AccountSummary {
            id: account.id,
            username: account.username,
            is_admin: account.is_admin,
            coins: account.coins,
        }),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> ApiResult<impl IntoResponse> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.destroy(cookie.value()).await;
    }

    let mut removal = Cookie::from(SESSION_COOKIE);
    removal.set_path("/");
    Ok((jar.remove(removal), Json(Ack::ok())))
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .build()
}
