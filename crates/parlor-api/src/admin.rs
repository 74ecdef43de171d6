use axum::{Extension, Json, extract::State};
use chrono::{Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use parlor_db::ledger::PromoInsert;
use parlor_types::api::{Ack, BanRequest, CreatePromoRequest, PromoteRequest, UnbanRequest};
use parlor_types::models::{Account, PromoCode};

use crate::error::{ApiError, ApiResult};
use crate::middleware::AdminAccount;
use crate::state::{AppState, blocking};

/// All registered accounts, digests stripped, newest first.
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<Account>>> {
    let db = state.db.clone();
    let rows = blocking(move || db.list_accounts()).await?;

    let accounts = rows
        .into_iter()
        .filter_map(|row| match row.into_account() {
            Ok(account) => Some(account),
            Err(e) => {
                warn!("skipping corrupt account row: {}", e);
                None
            }
        })
        .collect();
    Ok(Json(accounts))
}

pub async fn ban_user(
    State(state): State<AppState>,
    Extension(AdminAccount(admin)): Extension<AdminAccount>,
    Json(req): Json<BanRequest>,
) -> ApiResult<Json<Ack>> {
    let reason = req.reason.trim().to_string();
    if reason.is_empty() {
        return Err(ApiError::Validation("reason must not be empty".into()));
    }
    if req.duration_hours <= 0 {
        return Err(ApiError::Validation(
            "duration_hours must be positive".into(),
        ));
    }

    let expires = Utc::now() + Duration::hours(req.duration_hours);
    let user_id = req.user_id;
    let db = state.db.clone();
    let found =
        blocking(move || db.set_ban(&user_id.to_string(), &reason, Some(expires))).await?;
    if !found {
        return Err(ApiError::Validation("unknown user id".into()));
    }

    info!("{} banned account {} until {}", admin.username, user_id, expires);
    Ok(Json(Ack::ok()))
}

pub async fn unban_user(
    State(state): State<AppState>,
    Extension(AdminAccount(admin)): Extension<AdminAccount>,
    Json(req): Json<UnbanRequest>,
) -> ApiResult<Json<Ack>> {
    let user_id = req.user_id;
    let db = state.db.clone();
    let found = blocking(move || db.clear_ban(&user_id.to_string())).await?;
    if !found {
        return Err(ApiError::Validation("unknown user id".into()));
    }

    info!("{} unbanned account {}", admin.username, user_id);
    Ok(Json(Ack::ok()))
}

/// Set an account's privilege tier. Level 0 revokes admin entirely; the
/// change bites on the target's very next request.
pub async fn promote_user(
    State(state): State<AppState>,
    Extension(AdminAccount(admin)): Extension<AdminAccount>,
    Json(req): Json<PromoteRequest>,
) -> ApiResult<Json<Ack>> {
    if req.admin_level < 0 {
        return Err(ApiError::Validation("admin_level must be >= 0".into()));
    }

    let (user_id, level) = (req.user_id, req.admin_level);
    let db = state.db.clone();
    let found = blocking(move || db.set_admin_level(&user_id.to_string(), level)).await?;
    if !found {
        return Err(ApiError::Validation("unknown user id".into()));
    }

    info!(
        "{} set account {} to admin level {}",
        admin.username, user_id, level
    );
    Ok(Json(Ack::ok()))
}

pub async fn create_promo(
    State(state): State<AppState>,
    Extension(AdminAccount(admin)): Extension<AdminAccount>,
    Json(req): Json<CreatePromoRequest>,
) -> ApiResult<Json<Ack>> {
    if req.code.trim().is_empty() {
        return Err(ApiError::Validation("code must not be empty".into()));
    }
    if req.reward <= 0 {
        return Err(ApiError::InvalidReward);
    }
    if req.max_uses == 0 || req.max_uses < -1 {
        return Err(ApiError::Validation(
            "max_uses must be -1 (unlimited) or a positive bound".into(),
        ));
    }

    let id = Uuid::new_v4();
    let creator = admin.id.to_string();
    let db = state.db.clone();
    let outcome = blocking(move || {
        db.create_promo(&id.to_string(), &req.code, req.reward, req.max_uses, &creator)
    })
    .await?;

    match outcome {
        PromoInsert::Created => {
            info!("{} created promo code (id {})", admin.username, id);
            Ok(Json(Ack::ok()))
        }
        PromoInsert::Duplicate => Err(ApiError::DuplicateCode),
    }
}

/// All promo codes with their creator's username.
pub async fn list_promos(State(state): State<AppState>) -> ApiResult<Json<Vec<PromoCode>>> {
    let db = state.db.clone();
    let rows = blocking(move || db.list_promos()).await?;

    let promos = rows
        .into_iter()
        .filter_map(|row| match row.into_promo() {
            Ok(promo) => Some(promo),
            Err(e) => {
                warn!("skipping corrupt promo row: {}", e);
                None
            }
        })
        .collect();
    Ok(Json(promos))
}
